use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Bytes of one pushed frame and when it arrived.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InputSample {
    pub timestamp: Instant,
    pub bytes: u64,
}

/// Renderer cumulative counters read at `timestamp`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QualitySample {
    pub timestamp: Instant,
    pub decoded_frames: u64,
    pub dropped_frames: u64,
}

/// Sliding windows of input and quality samples.
///
/// Samples arrive in non-decreasing timestamp order, so eviction only ever
/// pops from the front and never needs to sort.
#[derive(Debug)]
pub struct SampleStore {
    horizon: Duration,
    inputs: VecDeque<InputSample>,
    qualities: VecDeque<QualitySample>,
}

impl SampleStore {
    /// Creates a store with room for `capacity` samples per window before
    /// the deques have to grow.
    pub fn new(horizon: Duration, capacity: usize) -> Self {
        Self {
            horizon,
            inputs: VecDeque::with_capacity(capacity),
            qualities: VecDeque::with_capacity(capacity),
        }
    }

    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    pub fn record_input(&mut self, now: Instant, bytes: u64) {
        self.inputs.push_back(InputSample {
            timestamp: now,
            bytes,
        });
    }

    pub fn record_quality(&mut self, sample: QualitySample) {
        self.qualities.push_back(sample);
    }

    /// Removes every sample strictly older than `now - horizon`.
    pub fn evict_older_than(&mut self, now: Instant) {
        let horizon = self.horizon;
        let expired = |timestamp: Instant| now.saturating_duration_since(timestamp) > horizon;

        while self.inputs.front().is_some_and(|s| expired(s.timestamp)) {
            self.inputs.pop_front();
        }
        while self.qualities.front().is_some_and(|s| expired(s.timestamp)) {
            self.qualities.pop_front();
        }
    }

    /// Clears both windows.
    pub fn reset(&mut self) {
        self.inputs.clear();
        self.qualities.clear();
    }

    pub fn inputs(&self) -> &VecDeque<InputSample> {
        &self.inputs
    }

    pub fn qualities(&self) -> &VecDeque<QualitySample> {
        &self.qualities
    }

    pub fn oldest_quality(&self) -> Option<&QualitySample> {
        self.qualities.front()
    }

    pub fn latest_quality(&self) -> Option<&QualitySample> {
        self.qualities.back()
    }
}
