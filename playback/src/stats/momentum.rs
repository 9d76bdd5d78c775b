use super::window::SampleStore;
use serde::Serialize;
use std::time::Instant;

/// Decode progress over the sample window.
///
/// Values are deltas/sums over the fixed window, not rates normalized by
/// elapsed time. `dropped_frames` is the renderer-reported drop delta; frames
/// lost before ever reaching the decoder are not included.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentumStats {
    #[serde(skip)]
    pub timestamp: Instant,
    pub decoded_frames: i64,
    pub dropped_frames: i64,
    pub input_bytes: u64,
    pub input_frames: u64,
}

/// Keeps the latest [`MomentumStats`] computed from a [`SampleStore`].
#[derive(Debug, Default)]
pub struct MomentumEstimator {
    stats: Option<MomentumStats>,
}

impl MomentumEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the stats from `store`.
    ///
    /// Returns `false` and keeps the previous value when the quality window
    /// is empty. A counter that went backwards (renderer replaced without a
    /// stats reset) shows up as a negative delta.
    pub fn update(&mut self, now: Instant, store: &SampleStore) -> bool {
        let (Some(oldest), Some(latest)) = (store.oldest_quality(), store.latest_quality()) else {
            return false;
        };

        self.stats = Some(MomentumStats {
            timestamp: now,
            decoded_frames: latest.decoded_frames as i64 - oldest.decoded_frames as i64,
            dropped_frames: latest.dropped_frames as i64 - oldest.dropped_frames as i64,
            input_bytes: store.inputs().iter().map(|s| s.bytes).sum(),
            input_frames: store.inputs().len() as u64,
        });
        true
    }

    pub fn stats(&self) -> Option<&MomentumStats> {
        self.stats.as_ref()
    }
}
