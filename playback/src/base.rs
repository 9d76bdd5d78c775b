//! Base playback controller - lifecycle state and video settings owned by
//! the surrounding decoder state machine.

use log::debug;
use serde::{Deserialize, Serialize};
use shared::error::{Error, Result};
use std::fmt;

const DEFAULT_MAX_FPS: u32 = 30;

/// Lifecycle state of the decoder this player is a strategy of.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Init,
    Playing,
    Paused,
    Stopped,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            PlaybackState::Init => "init",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

/// Video settings chosen by the caller.
///
/// `max_fps` is only used to size the sample windows for the nominal
/// frame rate; the momentum math itself never reads it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSettings {
    pub max_fps: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            max_fps: DEFAULT_MAX_FPS,
        }
    }
}

/// Lifecycle hooks of the base playback controller.
pub trait BasePlayback {
    fn on_play(&mut self) -> Result<()>;
    fn on_pause(&mut self) -> Result<()>;
    fn on_stop(&mut self) -> Result<()>;
    fn state(&self) -> PlaybackState;
    fn video_settings(&self) -> &VideoSettings;
}

/// Plain INIT/PLAYING/PAUSED/STOPPED bookkeeping.
///
/// `Stopped` is terminal: playing or pausing afterwards fails with
/// `Error::ErrPlayerStopped`.
#[derive(Debug, Default, Clone)]
pub struct DefaultPlayback {
    state: PlaybackState,
    video_settings: VideoSettings,
}

impl DefaultPlayback {
    pub fn new(video_settings: VideoSettings) -> Self {
        Self {
            state: PlaybackState::Init,
            video_settings,
        }
    }

    fn transition(&mut self, next: PlaybackState) -> Result<()> {
        if self.state == PlaybackState::Stopped && next != PlaybackState::Stopped {
            return Err(Error::ErrPlayerStopped);
        }
        if self.state != next {
            debug!("playback state {} -> {}", self.state, next);
            self.state = next;
        }
        Ok(())
    }
}

impl BasePlayback for DefaultPlayback {
    fn on_play(&mut self) -> Result<()> {
        self.transition(PlaybackState::Playing)
    }

    fn on_pause(&mut self) -> Result<()> {
        self.transition(PlaybackState::Paused)
    }

    fn on_stop(&mut self) -> Result<()> {
        self.transition(PlaybackState::Stopped)
    }

    fn state(&self) -> PlaybackState {
        self.state
    }

    fn video_settings(&self) -> &VideoSettings {
        &self.video_settings
    }
}
