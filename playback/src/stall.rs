//! Stall detection and seek-to-live recovery.

use crate::stats::MomentumStats;
use log::{debug, trace, warn};

pub(crate) const DEFAULT_STALL_THRESHOLD: u32 = 5;

/// Decides whether one [`MomentumStats`] observation counts as stalled.
pub trait StallPredicate {
    fn is_stalled(&self, stats: &MomentumStats) -> bool;
}

impl<F> StallPredicate for F
where
    F: Fn(&MomentumStats) -> bool,
{
    fn is_stalled(&self, stats: &MomentumStats) -> bool {
        self(stats)
    }
}

/// Input is arriving but the renderer decoded nothing over the window.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoDecodeProgress;

impl StallPredicate for NoDecodeProgress {
    fn is_stalled(&self, stats: &MomentumStats) -> bool {
        stats.decoded_frames == 0 && stats.input_frames > 0
    }
}

/// Recovery state of the player.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RecoveryState {
    /// Counting consecutive stalled observations.
    Normal { stalled_count: u32 },
    /// A forced seek to `target` was requested and has not completed yet.
    /// Observations are ignored in this state.
    SeekInFlight { target: f64 },
}

impl Default for RecoveryState {
    fn default() -> Self {
        RecoveryState::Normal { stalled_count: 0 }
    }
}

/// Result of feeding one observation to the [`StallDetector`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum StallObservation {
    /// A recovery seek is in flight, the observation was not counted.
    Ignored,
    /// Decode is progressing, the counter was reset.
    Progressing,
    /// Stalled, `count` consecutive times so far.
    Stalled { count: u32 },
    /// Stalled past the threshold: the caller must force a seek to `target`.
    Recover { target: f64 },
}

/// Counts consecutive stalled observations and decides when to recover.
pub struct StallDetector {
    predicate: Box<dyn StallPredicate>,
    threshold: u32,
    state: RecoveryState,
}

impl StallDetector {
    pub fn new(threshold: u32) -> Self {
        Self::with_predicate(threshold, NoDecodeProgress)
    }

    pub fn with_predicate(threshold: u32, predicate: impl StallPredicate + 'static) -> Self {
        Self::with_boxed_predicate(threshold, Box::new(predicate))
    }

    pub(crate) fn with_boxed_predicate(threshold: u32, predicate: Box<dyn StallPredicate>) -> Self {
        Self {
            predicate,
            threshold,
            state: RecoveryState::default(),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    /// Consecutive stalled observations, zero while a seek is in flight.
    pub fn stalled_count(&self) -> u32 {
        match self.state {
            RecoveryState::Normal { stalled_count } => stalled_count,
            RecoveryState::SeekInFlight { .. } => 0,
        }
    }

    /// Feeds one observation.
    ///
    /// `buffered_end` is only called once the threshold is exceeded and
    /// returns the end of the last buffered range, if any. Without a
    /// buffered range recovery is deferred to the next stalled observation.
    pub fn observe<F>(&mut self, stats: &MomentumStats, buffered_end: F) -> StallObservation
    where
        F: FnOnce() -> Option<f64>,
    {
        let RecoveryState::Normal { stalled_count } = self.state else {
            trace!("recovery seek in flight, ignoring observation");
            return StallObservation::Ignored;
        };

        if !self.predicate.is_stalled(stats) {
            self.state = RecoveryState::Normal { stalled_count: 0 };
            return StallObservation::Progressing;
        }

        let count = stalled_count.saturating_add(1);
        if count > self.threshold {
            if let Some(target) = buffered_end() {
                warn!(
                    "no decode progress for {} observations ({} input frames, {} bytes), seeking to {}",
                    count, stats.input_frames, stats.input_bytes, target
                );
                self.state = RecoveryState::SeekInFlight { target };
                return StallObservation::Recover { target };
            }
            debug!("stalled {count} times but nothing is buffered, deferring recovery");
        }

        self.state = RecoveryState::Normal {
            stalled_count: count,
        };
        StallObservation::Stalled { count }
    }

    /// Handles the surface's seek-completed signal. Returns `false` if no
    /// recovery seek was in flight, in which case nothing changes.
    pub fn on_seek_completed(&mut self) -> bool {
        match self.state {
            RecoveryState::SeekInFlight { target } => {
                debug!("recovery seek to {target} completed");
                self.state = RecoveryState::default();
                true
            }
            RecoveryState::Normal { .. } => false,
        }
    }

    /// Drops back to `Normal` with a zero counter, abandoning any seek in
    /// flight.
    pub fn reset(&mut self) {
        self.state = RecoveryState::default();
    }

    /// Zeroes the counter but keeps a seek in flight.
    pub fn reset_count(&mut self) {
        if let RecoveryState::Normal { .. } = self.state {
            self.state = RecoveryState::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn stats(decoded_frames: i64, input_frames: u64) -> MomentumStats {
        MomentumStats {
            timestamp: Instant::now(),
            decoded_frames,
            dropped_frames: 0,
            input_bytes: input_frames * 100,
            input_frames,
        }
    }

    #[test]
    fn test_no_decode_progress_predicate() {
        assert!(NoDecodeProgress.is_stalled(&stats(0, 3)));
        assert!(!NoDecodeProgress.is_stalled(&stats(0, 0)));
        assert!(!NoDecodeProgress.is_stalled(&stats(2, 3)));
    }

    #[test]
    fn test_counter_resets_on_progress() {
        let mut detector = StallDetector::new(DEFAULT_STALL_THRESHOLD);

        for i in 1..=3 {
            assert_eq!(
                detector.observe(&stats(0, 1), || Some(10.0)),
                StallObservation::Stalled { count: i }
            );
        }
        assert_eq!(
            detector.observe(&stats(5, 1), || Some(10.0)),
            StallObservation::Progressing
        );
        assert_eq!(detector.stalled_count(), 0);
    }

    #[test]
    fn test_recovers_once_threshold_exceeded() {
        let mut detector = StallDetector::new(DEFAULT_STALL_THRESHOLD);

        for _ in 0..5 {
            let obs = detector.observe(&stats(0, 1), || panic!("not needed yet"));
            assert!(matches!(obs, StallObservation::Stalled { .. }));
        }
        assert_eq!(detector.stalled_count(), 5);

        assert_eq!(
            detector.observe(&stats(0, 1), || Some(12.5)),
            StallObservation::Recover { target: 12.5 }
        );
        assert_eq!(detector.stalled_count(), 0);
        assert_eq!(
            detector.state(),
            RecoveryState::SeekInFlight { target: 12.5 }
        );
    }

    #[test]
    fn test_seek_in_flight_suppresses_counting() {
        let mut detector = StallDetector::new(1);
        detector.observe(&stats(0, 1), || Some(3.0));
        assert!(matches!(
            detector.observe(&stats(0, 1), || Some(3.0)),
            StallObservation::Recover { .. }
        ));

        for _ in 0..10 {
            assert_eq!(
                detector.observe(&stats(0, 1), || Some(4.0)),
                StallObservation::Ignored
            );
        }

        assert!(detector.on_seek_completed());
        assert_eq!(detector.state(), RecoveryState::Normal { stalled_count: 0 });
        // the listener is one-shot
        assert!(!detector.on_seek_completed());

        assert_eq!(
            detector.observe(&stats(0, 1), || Some(4.0)),
            StallObservation::Stalled { count: 1 }
        );
    }

    #[test]
    fn test_recovery_deferred_without_buffered_range() {
        let mut detector = StallDetector::new(2);

        for i in 1..=4 {
            assert_eq!(
                detector.observe(&stats(0, 1), || None),
                StallObservation::Stalled { count: i }
            );
        }
        assert_eq!(
            detector.observe(&stats(0, 1), || Some(8.0)),
            StallObservation::Recover { target: 8.0 }
        );
    }

    #[test]
    fn test_custom_predicate() {
        // stricter: treat heavy drops as a stall as well
        let mut detector = StallDetector::with_predicate(0, |s: &MomentumStats| {
            s.input_frames > 0 && (s.decoded_frames == 0 || s.dropped_frames > s.decoded_frames)
        });

        let mut dropping = stats(2, 5);
        dropping.dropped_frames = 3;
        assert_eq!(
            detector.observe(&dropping, || Some(1.0)),
            StallObservation::Recover { target: 1.0 }
        );
    }

    #[test]
    fn test_reset_count_keeps_seek_in_flight() {
        let mut detector = StallDetector::new(0);
        detector.observe(&stats(0, 1), || Some(1.0));

        detector.reset_count();
        assert_eq!(detector.state(), RecoveryState::SeekInFlight { target: 1.0 });

        detector.on_seek_completed();
        detector.observe(&stats(0, 1), || None);
        assert_eq!(detector.stalled_count(), 1);
        detector.reset_count();
        assert_eq!(detector.stalled_count(), 0);
    }

    #[test]
    fn test_deferred_counter_saturates() {
        let mut detector = StallDetector::new(DEFAULT_STALL_THRESHOLD);
        detector.state = RecoveryState::Normal {
            stalled_count: u32::MAX - 1,
        };

        for _ in 0..3 {
            assert_eq!(
                detector.observe(&stats(0, 1), || None),
                StallObservation::Stalled { count: u32::MAX }
            );
        }
        assert_eq!(
            detector.observe(&stats(0, 1), || Some(2.0)),
            StallObservation::Recover { target: 2.0 }
        );
    }

    #[test]
    fn test_reset_abandons_seek() {
        let mut detector = StallDetector::new(0);
        detector.observe(&stats(0, 1), || Some(1.0));
        assert!(matches!(detector.state(), RecoveryState::SeekInFlight { .. }));

        detector.reset();
        assert_eq!(detector.state(), RecoveryState::default());
        assert!(!detector.on_seek_completed());
    }
}
