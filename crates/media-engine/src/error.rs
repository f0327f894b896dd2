// FILE: crates/media-engine/src/error.rs

use serde::Serialize;
use thiserror::Error;

/// Failures raised by backends, decoders and output devices
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Seek error: {0}")]
    SeekError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Fetch error: {0}")]
    FetchError(#[from] securgeek_network::NetworkError),

    #[error("Audio handle has been released")]
    HandleReleased,

    #[error("No async runtime available: {0}")]
    RuntimeUnavailable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Playback failures as surfaced to the listener through `last_error`
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackError {
    #[error("Audio resource not found: {url}")]
    ResourceNotFound { url: String },

    #[error("Lesson did not become ready within {seconds}s")]
    LoadTimeout { seconds: u64 },

    #[error("Playback failed: {message}")]
    DecodeOrTransportError { message: String },

    #[error("Could not start playback: {message}")]
    PlaybackStartFailure { message: String },

    #[error("No signed-in user")]
    Unauthenticated,
}

impl PlaybackError {
    /// Whether the error panel should offer a Retry action
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PlaybackError::Unauthenticated)
    }

    pub fn user_message(&self) -> String {
        match self {
            PlaybackError::ResourceNotFound { .. } => {
                "This lesson's audio could not be found.".to_string()
            }
            PlaybackError::LoadTimeout { .. } => {
                "The lesson took too long to load. Check your connection and retry.".to_string()
            }
            PlaybackError::DecodeOrTransportError { .. } => {
                "Playback was interrupted.".to_string()
            }
            PlaybackError::PlaybackStartFailure { .. } => {
                "Playback could not start. Press play to try again.".to_string()
            }
            PlaybackError::Unauthenticated => "Please sign in to access this course.".to_string(),
        }
    }
}

impl From<PlaybackError> for securgeek_core::AppError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::Unauthenticated => securgeek_core::AppError::Unauthenticated,
            PlaybackError::LoadTimeout { seconds } => securgeek_core::AppError::NetworkTimeout {
                operation: "load lesson".to_string(),
                seconds,
            },
            other => securgeek_core::AppError::InternalError {
                message: other.to_string(),
            },
        }
    }
}
