//! Media Engine - lesson playback for SecurGeek
//!
//! - [`PlaybackController`]: single-handle state machine with the load deadline
//! - [`StreamingBackend`]: HTTP + symphonia audio handles
//! - [`DurationProber`] / [`DurationCache`]: real lesson lengths
//! - [`ProgressAggregator`]: measured module totals
//! - [`CoursePlayer`]: session-gated host tying it all together

mod backend;
mod controller;
mod decoder;
mod duration;
mod error;
mod events;
mod output;
mod progress;
mod remote;
mod session;
mod state;
mod stream;

pub use backend::{AudioBackend, AudioHandle};
pub use controller::{ControllerConfig, Dispatch, PlaybackController};
pub use decoder::{measure_duration, AudioDecoder, DecodedAudio};
pub use duration::{DurationCache, DurationProber, SymphoniaProber};
pub use error::{EngineError, EngineResult, PlaybackError};
pub use events::{EventSink, HandleId, MediaEvent, MediaEventKind};
pub use output::{AudioOutput, SilentOutput};
pub use progress::ProgressAggregator;
pub use remote::{open_remote, RemoteControl, RemoteSource, StallObserver};
pub use session::{
    ActiveLessonView, CoursePlayer, ErrorPanel, LessonView, ModuleView, Navigator, PlayerUpdate,
    PlayerView, SessionGate, StaticSessionGate,
};
pub use state::{PlaybackSession, PlayerState};
pub use stream::{PlaybackCommand, StreamHandle, StreamingBackend};

pub type Result<T> = std::result::Result<T, EngineError>;
