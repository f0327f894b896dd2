//! Seam between the playback controller and whatever produces audio

use crate::error::EngineResult;
use crate::events::EventSink;

/// Factory for audio handles.
///
/// `open` must return promptly; loading happens in the background and is
/// reported through `sink` (`MetadataLoaded`/`CanPlay` when ready, `Error`
/// on failure).
pub trait AudioBackend: Send + Sync {
    fn open(
        &self,
        resource_url: &str,
        volume: f32,
        sink: EventSink,
    ) -> EngineResult<Box<dyn AudioHandle>>;
}

/// One loaded audio resource.
///
/// After `release` the handle must stop producing sound and should stop
/// emitting events; any event it still emits is discarded by the controller.
pub trait AudioHandle: Send {
    fn play(&mut self) -> EngineResult<()>;

    fn pause(&mut self) -> EngineResult<()>;

    fn seek(&mut self, position_secs: f64) -> EngineResult<()>;

    fn set_volume(&mut self, volume: f32) -> EngineResult<()>;

    fn release(&mut self);
}
