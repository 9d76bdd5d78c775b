//! H.264 player - feeds frames to an output surface and recovers from
//! silent decode stalls.

use crate::base::{BasePlayback, DefaultPlayback, PlaybackState};
use crate::stall::{
    DEFAULT_STALL_THRESHOLD, NoDecodeProgress, RecoveryState, StallDetector, StallObservation,
    StallPredicate,
};
use crate::stats::{MomentumEstimator, MomentumStats, QualitySampler, SampleStore};
use crate::surface::OutputSurface;
use crate::trim::BufferTrimPolicy;
use crate::{PlaybackCommand, PlayerEvent, SurfaceEvent};
use log::{debug, error, trace};
use media::{FrameClassifier, H264FrameClassifier};
use shared::TaggedBytes;
use shared::error::{Error, Result};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const DEFAULT_WINDOW: Duration = Duration::from_millis(1000);
const DEFAULT_MAX_EVENTS: usize = 128;
// upper bound for the window deques allocated up front, they grow past it
const MAX_PREALLOCATED_SAMPLES: usize = 4096;

/// Builder for the [`H264Player`].
///
/// # Example
///
/// ```ignore
/// use playback::{DefaultPlayback, PlayerBuilder, VideoSettings};
/// use media::H264FrameClassifier;
/// use std::time::Duration;
///
/// let player = PlayerBuilder::new()
///     .with_window(Duration::from_millis(1000))
///     .with_stall_threshold(5)
///     .build(
///         surface,
///         H264FrameClassifier::new(),
///         DefaultPlayback::new(VideoSettings { max_fps: 60 }),
///     );
/// ```
pub struct PlayerBuilder {
    /// Length of the sample windows.
    window: Duration,
    /// Consecutive stalled observations tolerated before recovering.
    stall_threshold: u32,
    /// What counts as a stalled observation.
    stall_predicate: Box<dyn StallPredicate>,
    /// Whether key frames trim the already-played buffer.
    buffer_trim: bool,
    /// Maximum number of undrained [`PlayerEvent`]s kept.
    max_events: usize,
}

impl Default for PlayerBuilder {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
            stall_predicate: Box::new(NoDecodeProgress),
            buffer_trim: true,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

impl PlayerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the length of the sliding sample windows.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set how many consecutive stalled observations are tolerated.
    ///
    /// Recovery fires on the first stalled observation past the threshold.
    pub fn with_stall_threshold(mut self, threshold: u32) -> Self {
        self.stall_threshold = threshold;
        self
    }

    /// Replace the default "no decode progress while input arrives"
    /// predicate.
    pub fn with_stall_predicate(mut self, predicate: impl StallPredicate + 'static) -> Self {
        self.stall_predicate = Box::new(predicate);
        self
    }

    /// Enable or disable trimming of played media on key frames.
    pub fn with_buffer_trim(mut self, enabled: bool) -> Self {
        self.buffer_trim = enabled;
        self
    }

    /// Set how many undrained events are kept before the oldest is dropped.
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    /// Build the player around its collaborators.
    pub fn build<S, C, B>(self, surface: S, classifier: C, base: B) -> H264Player<S, C, B>
    where
        S: OutputSurface,
        C: FrameClassifier,
        B: BasePlayback,
    {
        let max_fps = base.video_settings().max_fps;
        let capacity = ((f64::from(max_fps) * self.window.as_secs_f64()).ceil() as usize)
            .saturating_add(1)
            .min(MAX_PREALLOCATED_SAMPLES);

        H264Player {
            surface,
            classifier,
            base,
            store: SampleStore::new(self.window, capacity),
            sampler: QualitySampler::new(),
            estimator: MomentumEstimator::new(),
            detector: StallDetector::with_boxed_predicate(
                self.stall_threshold,
                self.stall_predicate,
            ),
            trim: BufferTrimPolicy::new(self.buffer_trim),
            events: VecDeque::new(),
            max_events: self.max_events,
        }
    }
}

/// Plays a stream of H.264 access units through an [`OutputSurface`].
///
/// Every pushed frame is appended to the surface (after trimming played
/// media on key frames), then feeds the sample windows, the momentum
/// estimate and the stall detector. A stall that persists past the
/// threshold forces a seek to the end of the buffered media; further stalls
/// are ignored until the surface reports the seek as completed.
pub struct H264Player<S, C = H264FrameClassifier, B = DefaultPlayback> {
    surface: S,
    classifier: C,
    base: B,

    store: SampleStore,
    sampler: QualitySampler,
    estimator: MomentumEstimator,
    detector: StallDetector,
    trim: BufferTrimPolicy,

    events: VecDeque<PlayerEvent>,
    max_events: usize,
}

impl<S: OutputSurface> H264Player<S> {
    /// Create a player with default settings, H.264 key-frame detection and
    /// plain lifecycle bookkeeping.
    pub fn new(surface: S) -> Self {
        PlayerBuilder::new().build(
            surface,
            H264FrameClassifier::new(),
            DefaultPlayback::default(),
        )
    }
}

impl<S, C, B> H264Player<S, C, B>
where
    S: OutputSurface,
    C: FrameClassifier,
    B: BasePlayback,
{
    /// Pushes one compressed frame that became available at `now`.
    ///
    /// Frames must be pushed in arrival order with non-decreasing `now`.
    /// Surface errors are returned as-is and are not retried.
    ///
    /// Stall detection and recovery only run once [`play`](Self::play) was
    /// called: in `Init` and `Paused` frames are appended and sampled, but
    /// no stall is ever counted.
    pub fn push_frame(&mut self, now: Instant, frame: &[u8]) -> Result<()> {
        if self.base.state() == PlaybackState::Stopped {
            return Err(Error::ErrPlayerStopped);
        }

        if self.classifier.is_key_frame(frame) {
            let trimmed = self
                .trim
                .trim(&mut self.surface)
                .inspect_err(|err| error!("buffer trim rejected: {err}"))?;
            if let Some(range) = trimmed {
                self.enqueue_event(PlayerEvent::BufferTrimmed { range });
            }
        }

        self.surface
            .append_data(frame)
            .inspect_err(|err| error!("append of {} bytes rejected: {err}", frame.len()))?;

        self.store.record_input(now, frame.len() as u64);
        let sample = self.sampler.sample_now(now, &self.surface);
        if let Some(sample) = sample {
            self.store.record_quality(sample);
        }
        self.store.evict_older_than(now);

        // Without a fresh quality sample the momentum stays stale and there
        // is nothing to detect a stall from.
        if sample.is_none() || !self.estimator.update(now, &self.store) {
            return Ok(());
        }

        if self.base.state() != PlaybackState::Playing {
            return Ok(());
        }

        match self.estimator.stats().copied() {
            Some(stats) => self.detect_stall(&stats),
            None => Ok(()),
        }
    }

    fn detect_stall(&mut self, stats: &MomentumStats) -> Result<()> {
        let surface = &self.surface;
        let observation = self
            .detector
            .observe(stats, || surface.buffered_ranges().last().map(|r| r.end));

        match observation {
            StallObservation::Stalled { count } => {
                trace!(
                    "stalled observation {count}: {} input frames, {} decoded",
                    stats.input_frames, stats.decoded_frames
                );
                self.enqueue_event(PlayerEvent::StallDetected { count });
            }
            StallObservation::Recover { target } => {
                if let Err(err) = self.surface.force_seek(target) {
                    error!("recovery seek to {target} rejected: {err}");
                    self.detector.reset();
                    return Err(err);
                }
                self.enqueue_event(PlayerEvent::RecoverySeek { position: target });
            }
            StallObservation::Progressing | StallObservation::Ignored => {}
        }

        Ok(())
    }

    /// Handles the surface's seek-completed signal.
    pub fn on_seek_completed(&mut self) {
        if self.detector.on_seek_completed() {
            self.enqueue_event(PlayerEvent::RecoveryCompleted);
        } else {
            trace!("seek completed without a recovery seek in flight");
        }
    }

    /// Clears both sample windows. Must be called whenever the renderer
    /// session behind the surface changes, since its counters restart.
    ///
    /// The last [`MomentumStats`] stays readable until a new one is computed.
    pub fn reset_stats(&mut self) {
        self.store.reset();
    }

    /// Swaps in a new renderer backend and returns the previous one.
    ///
    /// Sample windows, the quality capability probe and any recovery seek
    /// in flight on the old surface are reset.
    pub fn replace_surface(&mut self, surface: S) -> S {
        debug!("output surface replaced, resetting playback statistics");
        self.reset_stats();
        self.sampler.reset_capability();
        self.detector.reset();
        std::mem::replace(&mut self.surface, surface)
    }

    pub fn play(&mut self) -> Result<()> {
        self.base.on_play()?;
        self.enqueue_event(PlayerEvent::StateChanged(self.base.state()));
        Ok(())
    }

    /// Pauses playback. A paused renderer makes no decode progress, so the
    /// stall counter restarts from zero on the next play.
    pub fn pause(&mut self) -> Result<()> {
        self.base.on_pause()?;
        self.detector.reset_count();
        self.enqueue_event(PlayerEvent::StateChanged(self.base.state()));
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.base.on_stop()?;
        self.detector.reset();
        self.reset_stats();
        self.enqueue_event(PlayerEvent::StateChanged(self.base.state()));
        Ok(())
    }

    pub fn state(&self) -> PlaybackState {
        self.base.state()
    }

    /// Latest momentum estimate, `None` until one was computed.
    pub fn momentum_quality_stats(&self) -> Option<&MomentumStats> {
        self.estimator.stats()
    }

    pub fn stall_count(&self) -> u32 {
        self.detector.stalled_count()
    }

    pub fn recovery_state(&self) -> RecoveryState {
        self.detector.state()
    }

    pub fn sample_store(&self) -> &SampleStore {
        &self.store
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn base(&self) -> &B {
        &self.base
    }

    fn enqueue_event(&mut self, event: PlayerEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            trace!("event queue full, dropping {:?}", self.events.front());
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

impl<S, C, B> sansio::Protocol<TaggedBytes, PlaybackCommand, SurfaceEvent> for H264Player<S, C, B>
where
    S: OutputSurface,
    C: FrameClassifier,
    B: BasePlayback,
{
    type Rout = ();
    type Wout = ();
    type Eout = PlayerEvent;
    type Error = Error;
    type Time = Instant;

    fn handle_read(&mut self, msg: TaggedBytes) -> Result<()> {
        self.push_frame(msg.now, &msg.message)
    }

    fn poll_read(&mut self) -> Option<Self::Rout> {
        None
    }

    fn handle_write(&mut self, cmd: PlaybackCommand) -> Result<()> {
        match cmd {
            PlaybackCommand::Play => self.play(),
            PlaybackCommand::Pause => self.pause(),
            PlaybackCommand::Stop => self.stop(),
            PlaybackCommand::ResetStats => {
                self.reset_stats();
                Ok(())
            }
        }
    }

    fn poll_write(&mut self) -> Option<Self::Wout> {
        None
    }

    fn handle_event(&mut self, evt: SurfaceEvent) -> Result<()> {
        match evt {
            SurfaceEvent::SeekCompleted => self.on_seek_completed(),
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Option<Self::Eout> {
        self.events.pop_front()
    }

    fn handle_timeout(&mut self, _now: Self::Time) -> Result<()> {
        Ok(())
    }

    fn poll_timeout(&mut self) -> Option<Self::Time> {
        None
    }

    fn close(&mut self) -> Result<()> {
        if self.base.state() != PlaybackState::Stopped {
            self.stop()?;
        }
        self.events.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::VideoSettings;
    use crate::surface::{PlaybackQuality, TimeRange};

    #[derive(Default)]
    struct NullSurface {
        appended: usize,
    }

    impl OutputSurface for NullSurface {
        fn append_data(&mut self, _data: &[u8]) -> Result<()> {
            self.appended += 1;
            Ok(())
        }

        fn request_removal(&mut self, _start: f64, _end: f64) -> Result<()> {
            Ok(())
        }

        fn buffered_ranges(&self) -> Vec<TimeRange> {
            vec![TimeRange::new(0.0, 1.0)]
        }

        fn playback_quality(&self) -> Option<PlaybackQuality> {
            Some(PlaybackQuality::default())
        }

        fn force_seek(&mut self, _position: f64) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_player_builder_defaults() {
        let player = H264Player::new(NullSurface::default());

        assert_eq!(player.store.horizon(), Duration::from_millis(1000));
        assert_eq!(player.detector.threshold(), 5);
        assert!(player.trim.is_enabled());
        assert_eq!(player.max_events, 128);
        assert_eq!(player.state(), PlaybackState::Init);
    }

    #[test]
    fn test_player_builder_custom() {
        let player = PlayerBuilder::new()
            .with_window(Duration::from_millis(500))
            .with_stall_threshold(2)
            .with_buffer_trim(false)
            .with_max_events(4)
            .build(
                NullSurface::default(),
                H264FrameClassifier::new(),
                DefaultPlayback::new(VideoSettings { max_fps: 60 }),
            );

        assert_eq!(player.store.horizon(), Duration::from_millis(500));
        assert_eq!(player.detector.threshold(), 2);
        assert!(!player.trim.is_enabled());
        assert_eq!(player.max_events, 4);
        assert_eq!(player.base().video_settings().max_fps, 60);
    }

    #[test]
    fn test_huge_window_caps_preallocation() {
        for window in [Duration::MAX, Duration::from_secs(365 * 24 * 3600)] {
            let mut player = PlayerBuilder::new().with_window(window).build(
                NullSurface::default(),
                H264FrameClassifier::new(),
                DefaultPlayback::default(),
            );

            assert_eq!(player.store.horizon(), window);
            assert!(player.store.inputs().capacity() <= MAX_PREALLOCATED_SAMPLES);

            player.play().unwrap();
            let base = Instant::now();
            player.push_frame(base, &[0, 0, 0, 1, 0x41]).unwrap();
            player
                .push_frame(base + Duration::from_secs(3600), &[0, 0, 0, 1, 0x41])
                .unwrap();
            assert_eq!(player.store.inputs().len(), 2);
        }
    }

    #[test]
    fn test_event_queue_is_bounded() {
        let mut player = PlayerBuilder::new().with_max_events(2).build(
            NullSurface::default(),
            H264FrameClassifier::new(),
            DefaultPlayback::default(),
        );

        player.play().unwrap();
        player.pause().unwrap();
        player.play().unwrap();

        assert_eq!(player.events.len(), 2);
        assert_eq!(
            player.events.front(),
            Some(&PlayerEvent::StateChanged(PlaybackState::Paused))
        );
    }

    #[test]
    fn test_push_after_stop_fails() {
        let mut player = H264Player::new(NullSurface::default());
        player.stop().unwrap();

        assert_eq!(
            player.push_frame(Instant::now(), &[0, 0, 0, 1, 0x41]),
            Err(Error::ErrPlayerStopped)
        );
        assert_eq!(player.surface().appended, 0);
    }
}
