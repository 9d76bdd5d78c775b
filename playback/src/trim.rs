//! Buffer trim policy - evicts already-played media at key-frame boundaries.

use crate::surface::{OutputSurface, TimeRange};
use log::trace;
use shared::error::Result;

/// Removes the first buffered range from the surface right before a key
/// frame is appended.
///
/// A key frame is independently decodable, so nothing buffered before it is
/// needed to decode what follows. The range end is floored to whole seconds,
/// the granularity removal requests are addressed with.
#[derive(Debug, Copy, Clone)]
pub struct BufferTrimPolicy {
    enabled: bool,
}

impl Default for BufferTrimPolicy {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl BufferTrimPolicy {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Computes the range to remove ahead of a key frame, if any.
    pub fn range_to_trim(&self, buffered: &[TimeRange]) -> Option<TimeRange> {
        if !self.enabled {
            return None;
        }
        let first = buffered.first()?;
        let end = first.end.floor();
        if first.start < end {
            Some(TimeRange::new(first.start, end))
        } else {
            None
        }
    }

    /// Requests removal of the first buffered range from `surface`.
    /// Returns the removed range.
    pub fn trim<S>(&self, surface: &mut S) -> Result<Option<TimeRange>>
    where
        S: OutputSurface + ?Sized,
    {
        let Some(range) = self.range_to_trim(&surface.buffered_ranges()) else {
            return Ok(None);
        };

        trace!("trimming buffered range [{}, {})", range.start, range.end);
        surface.request_removal(range.start, range.end)?;
        Ok(Some(range))
    }
}
