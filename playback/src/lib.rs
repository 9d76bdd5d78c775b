//! Playback - Sans-IO H.264 elementary-stream playback controller.
//!
//! This crate feeds compressed H.264 access units to an incremental
//! decoder/renderer (an [`OutputSurface`]), continuously estimates decode
//! throughput and recovers from silent stalls by seeking to the freshest
//! buffered position.
//!
//! # Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`SampleStore`] | Sliding windows of input arrivals and renderer quality samples |
//! | [`QualitySampler`] | Reads the renderer's cumulative decoded/dropped counters once per frame |
//! | [`MomentumEstimator`] | Differences the oldest and newest retained samples into [`MomentumStats`] |
//! | [`StallDetector`] | Counts stalled observations and decides when to force a recovery seek |
//! | [`BufferTrimPolicy`] | Evicts already-played media on key-frame boundaries |
//! | [`H264Player`] | Drives all of the above for every pushed frame |
//!
//! # Event flow
//!
//! ```text
//! frame available:  [key frame? trim] → append → record input → sample quality
//!                   → evict → momentum → stall detector → [forced seek]
//! seek completed:   SeekInFlight → Normal
//! ```
//!
//! The player never reads the clock: every frame carries the instant it
//! became available, which keeps the window math deterministic.
//!
//! # Quick Start
//!
//! ```ignore
//! use playback::{H264Player, PlaybackCommand, SurfaceEvent};
//! use sansio::Protocol;
//! use shared::TaggedBytes;
//!
//! let mut player = H264Player::new(surface);
//! player.handle_write(PlaybackCommand::Play)?;
//!
//! // for every demuxed access unit
//! player.handle_read(TaggedBytes::new(Instant::now(), access_unit))?;
//! while let Some(event) = player.poll_event() {
//!     log::info!("{event:?}");
//! }
//!
//! // when the surface reports that a seek finished
//! player.handle_event(SurfaceEvent::SeekCompleted)?;
//! ```

#![warn(rust_2018_idioms)]

mod base;
mod player;
mod stall;
mod surface;
mod trim;

pub(crate) mod stats;

pub use base::{BasePlayback, DefaultPlayback, PlaybackState, VideoSettings};
pub use player::{H264Player, PlayerBuilder};
pub use stall::{NoDecodeProgress, RecoveryState, StallDetector, StallObservation, StallPredicate};
pub use stats::{
    InputSample, MomentumEstimator, MomentumStats, QualitySample, QualitySampler, SampleStore,
};
pub use surface::{OutputSurface, PlaybackQuality, TimeRange};
pub use trim::BufferTrimPolicy;

/// Telemetry emitted by the player, drained with `poll_event`.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// The base playback controller changed state.
    StateChanged(PlaybackState),
    /// Played media was removed ahead of a key frame.
    BufferTrimmed { range: TimeRange },
    /// A stalled observation, `count` consecutive so far.
    StallDetected { count: u32 },
    /// A recovery seek to `position` was requested.
    RecoverySeek { position: f64 },
    /// The recovery seek completed and stall counting resumed.
    RecoveryCompleted,
}

/// Lifecycle commands accepted through `handle_write`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Stop,
    /// Clear the sample windows, e.g. after the renderer session changed.
    ResetStats,
}

/// Asynchronous notifications from the output surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// A seek requested through `force_seek` finished.
    SeekCompleted,
}
