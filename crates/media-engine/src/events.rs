//! Handle-tagged media events
//!
//! Every handle gets its own [`EventSink`] stamped with a fresh [`HandleId`].
//! Events from all handles share one queue; the controller drops those whose
//! id no longer matches the live handle.

use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

/// Identity of one acquired audio handle. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandleId(u64);

impl HandleId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEventKind {
    /// Total duration became known
    MetadataLoaded { duration_secs: f64 },
    /// Enough data is buffered to start
    CanPlay,
    /// Playback stalled waiting for data
    Waiting,
    /// Playback is producing audio
    Playing,
    TimeUpdate { position_secs: f64 },
    Ended,
    /// Decode or transport failure
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaEvent {
    pub handle: HandleId,
    pub kind: MediaEventKind,
}

/// Publishing side given to a backend when a handle is opened
#[derive(Debug, Clone)]
pub struct EventSink {
    handle: HandleId,
    tx: UnboundedSender<MediaEvent>,
}

impl EventSink {
    pub(crate) fn new(handle: HandleId, tx: UnboundedSender<MediaEvent>) -> Self {
        Self { handle, tx }
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Publishes an event. Returns false once the controller is gone.
    pub fn emit(&self, kind: MediaEventKind) -> bool {
        self.tx
            .send(MediaEvent {
                handle: self.handle,
                kind,
            })
            .is_ok()
    }
}
