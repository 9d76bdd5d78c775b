//! Output surface - the decoder/renderer append target driven by the player.

use shared::error::Result;

/// A half-open buffered time range `[start, end)` in seconds of media time.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Cumulative playback-quality counters reported by the renderer.
///
/// Both counters are monotonic for the lifetime of one renderer session.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PlaybackQuality {
    pub decoded_frames: u64,
    pub dropped_frames: u64,
}

/// The incremental decoder/renderer backend frames are appended to.
///
/// All requests are fire-and-forget: removal and seek complete
/// asynchronously, and seek completion is reported back to the player as
/// [`SurfaceEvent::SeekCompleted`](crate::SurfaceEvent::SeekCompleted).
pub trait OutputSurface {
    /// Appends one compressed frame to the decode buffer.
    fn append_data(&mut self, data: &[u8]) -> Result<()>;

    /// Requests removal of the buffered media in `[start, end)`.
    fn request_removal(&mut self, start: f64, end: f64) -> Result<()>;

    /// Buffered ranges, ordered by start time.
    fn buffered_ranges(&self) -> Vec<TimeRange>;

    /// Whether this backend exposes playback-quality counters at all.
    /// Probed once per backend by the quality sampler.
    fn supports_playback_quality(&self) -> bool {
        true
    }

    /// Current cumulative decode/drop counters, `None` when unavailable.
    fn playback_quality(&self) -> Option<PlaybackQuality>;

    /// Moves the playback position to `position` seconds.
    fn force_seek(&mut self, position: f64) -> Result<()>;
}

impl<S: OutputSurface + ?Sized> OutputSurface for Box<S> {
    fn append_data(&mut self, data: &[u8]) -> Result<()> {
        (**self).append_data(data)
    }

    fn request_removal(&mut self, start: f64, end: f64) -> Result<()> {
        (**self).request_removal(start, end)
    }

    fn buffered_ranges(&self) -> Vec<TimeRange> {
        (**self).buffered_ranges()
    }

    fn supports_playback_quality(&self) -> bool {
        (**self).supports_playback_quality()
    }

    fn playback_quality(&self) -> Option<PlaybackQuality> {
        (**self).playback_quality()
    }

    fn force_seek(&mut self, position: f64) -> Result<()> {
        (**self).force_seek(position)
    }
}
