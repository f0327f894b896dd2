//! Playback session state

use crate::error::PlaybackError;
use crate::events::HandleId;
use securgeek_core::LessonId;
use serde::Serialize;
use std::fmt;

/// Lifecycle of the lesson currently owned by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    /// Nothing selected yet
    Idle,
    /// Handle acquired, waiting for the ready signal
    Loading,
    /// Ready and not playing
    Paused,
    Playing,
    /// Reached the end; the handle is kept for replay
    Ended,
    /// Terminal for the lesson until retried
    Error,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerState::Idle => "idle",
            PlayerState::Loading => "loading",
            PlayerState::Paused => "paused",
            PlayerState::Playing => "playing",
            PlayerState::Ended => "ended",
            PlayerState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Snapshot of everything the controller knows about the current lesson
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSession {
    pub state: PlayerState,
    pub active_lesson_id: Option<LessonId>,
    /// Live handle, if any
    pub handle: Option<HandleId>,
    pub current_time_secs: f64,
    /// Zero until metadata arrives
    pub total_duration_secs: f64,
    pub is_playing: bool,
    pub is_buffering: bool,
    /// Gain in `[0, 1]`
    pub volume: f32,
    pub last_error: Option<PlaybackError>,
}

impl PlaybackSession {
    pub fn new(volume: f32) -> Self {
        Self {
            state: PlayerState::Idle,
            active_lesson_id: None,
            handle: None,
            current_time_secs: 0.0,
            total_duration_secs: 0.0,
            is_playing: false,
            is_buffering: false,
            volume: clamp_volume(volume, 1.0),
            last_error: None,
        }
    }

    pub fn has_live_handle(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_duration_known(&self) -> bool {
        self.total_duration_secs > 0.0
    }

    pub fn progress_percentage(&self) -> f32 {
        if !self.is_duration_known() {
            return 0.0;
        }
        ((self.current_time_secs / self.total_duration_secs) * 100.0) as f32
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Clamps to `[0, 1]`, keeping `fallback` for NaN
pub(crate) fn clamp_volume(volume: f32, fallback: f32) -> f32 {
    if volume.is_nan() {
        fallback
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Clamps a position to `[0, total]`; NaN becomes 0
pub(crate) fn clamp_position(position: f64, total: f64) -> f64 {
    if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, total.max(0.0))
    }
}
