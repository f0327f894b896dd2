// FILE: crates/media-engine/src/stream.rs
//! Network-backed audio handles
//!
//! Each handle owns one playback thread and one progressive download. The
//! thread decodes with symphonia straight from the download and paces audio
//! through an [`AudioOutput`](crate::output::AudioOutput). Metadata is
//! reported as soon as the container header has arrived. The handle talks to
//! the thread over a command channel.

use crate::backend::{AudioBackend, AudioHandle};
use crate::decoder::AudioDecoder;
use crate::error::{EngineError, EngineResult};
use crate::events::{EventSink, MediaEventKind};
use crate::output::open_output;
use crate::remote::{open_remote, RemoteControl, RemoteSource};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use securgeek_network::{AssetResolver, Client, Url};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::runtime::Handle as RuntimeHandle;

/// Interval between `TimeUpdate` events while playing
const TIME_UPDATE_INTERVAL: Duration = Duration::from_millis(250);

/// Commands sent to the playback thread
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Seek(f64),
    SetVolume(f32),
    Stop,
}

/// Backend that streams lessons over HTTP
#[derive(Clone)]
pub struct StreamingBackend {
    client: Client,
    resolver: AssetResolver,
    runtime: RuntimeHandle,
}

impl StreamingBackend {
    /// Must be called from within a tokio runtime
    pub fn new(client: Client, resolver: AssetResolver) -> EngineResult<Self> {
        let runtime = RuntimeHandle::try_current()
            .map_err(|e| EngineError::RuntimeUnavailable(e.to_string()))?;
        Ok(Self::with_runtime(client, resolver, runtime))
    }

    pub fn with_runtime(client: Client, resolver: AssetResolver, runtime: RuntimeHandle) -> Self {
        Self {
            client,
            resolver,
            runtime,
        }
    }
}

impl AudioBackend for StreamingBackend {
    fn open(
        &self,
        resource_url: &str,
        volume: f32,
        sink: EventSink,
    ) -> EngineResult<Box<dyn AudioHandle>> {
        let url = self.resolver.resolve(resource_url)?;
        let extension = extension_of(&url);

        let playing = Arc::new(AtomicBool::new(false));
        let (source, remote) = open_remote(self.client.clone(), url.clone(), &self.runtime);
        let source = source.with_observer({
            let sink = sink.clone();
            let playing = playing.clone();
            Arc::new(move |stalled| {
                if playing.load(Ordering::Acquire) {
                    sink.emit(if stalled {
                        MediaEventKind::Waiting
                    } else {
                        MediaEventKind::Playing
                    });
                }
            })
        });

        let (command_tx, command_rx) = bounded(32);
        let name = format!("playback-{}", sink.handle().value());
        thread::Builder::new()
            .name(name)
            .spawn(move || {
                let worker = PlaybackWorker {
                    sink,
                    commands: command_rx,
                    volume,
                    playing,
                    position: 0.0,
                };
                worker.run(url, extension, source);
            })
            .map_err(EngineError::IoError)?;

        Ok(Box::new(StreamHandle {
            commands: Some(command_tx),
            remote: Some(remote),
        }))
    }
}

pub(crate) fn extension_of(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Handle to one playback thread and its download
pub struct StreamHandle {
    commands: Option<Sender<PlaybackCommand>>,
    remote: Option<RemoteControl>,
}

impl StreamHandle {
    fn send(&self, command: PlaybackCommand) -> EngineResult<()> {
        self.commands
            .as_ref()
            .ok_or(EngineError::HandleReleased)?
            .send(command)
            .map_err(|_| EngineError::HandleReleased)
    }
}

impl AudioHandle for StreamHandle {
    fn play(&mut self) -> EngineResult<()> {
        self.send(PlaybackCommand::Play)
    }

    fn pause(&mut self) -> EngineResult<()> {
        self.send(PlaybackCommand::Pause)
    }

    fn seek(&mut self, position_secs: f64) -> EngineResult<()> {
        self.send(PlaybackCommand::Seek(position_secs))
    }

    fn set_volume(&mut self, volume: f32) -> EngineResult<()> {
        self.send(PlaybackCommand::SetVolume(volume))
    }

    fn release(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.try_send(PlaybackCommand::Stop);
        }
        // Aborts the fetch and wakes a thread blocked on the download
        if let Some(mut remote) = self.remote.take() {
            remote.release();
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.release();
    }
}

struct PlaybackWorker {
    sink: EventSink,
    commands: Receiver<PlaybackCommand>,
    volume: f32,
    /// Shared with the stall observer
    playing: Arc<AtomicBool>,
    position: f64,
}

enum Flow {
    Continue,
    Stop,
}

impl PlaybackWorker {
    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    /// True once the handle has let go; failures after that are not reported
    fn is_released(&self) -> bool {
        matches!(
            self.commands.try_recv(),
            Ok(PlaybackCommand::Stop) | Err(TryRecvError::Disconnected)
        )
    }

    fn fail(&self, url: &Url, message: String) {
        if self.is_released() {
            log::debug!("Playback of {} released: {}", url, message);
            return;
        }
        log::warn!("Playback of {} failed: {}", url, message);
        self.sink.emit(MediaEventKind::Error { message });
    }

    fn run(mut self, url: Url, extension: Option<String>, source: RemoteSource) {
        self.sink.emit(MediaEventKind::Waiting);

        let mut decoder = match AudioDecoder::open(Box::new(source), extension.as_deref()) {
            Ok(decoder) => decoder,
            Err(e) => {
                self.fail(&url, e.to_string());
                return;
            }
        };

        let declared = decoder.duration_secs();
        self.sink.emit(MediaEventKind::MetadataLoaded {
            duration_secs: declared.unwrap_or(0.0),
        });
        self.sink.emit(MediaEventKind::CanPlay);

        let spec = *decoder.spec();
        let mut output = open_output(spec.rate, spec.channels.count() as u16);
        let mut last_update = Instant::now();

        loop {
            let command = if self.is_playing() {
                match self.commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match self.commands.recv_timeout(Duration::from_millis(500)) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            };

            if let Some(command) = command {
                let flow = match command {
                    PlaybackCommand::Play => {
                        if !self.is_playing() {
                            self.set_playing(true);
                            self.sink.emit(MediaEventKind::Playing);
                        }
                        Flow::Continue
                    }
                    PlaybackCommand::Pause => {
                        self.set_playing(false);
                        output.flush();
                        Flow::Continue
                    }
                    PlaybackCommand::Seek(t) => {
                        output.flush();
                        self.seek(&mut decoder, t);
                        Flow::Continue
                    }
                    PlaybackCommand::SetVolume(v) => {
                        self.volume = v.clamp(0.0, 1.0);
                        Flow::Continue
                    }
                    PlaybackCommand::Stop => Flow::Stop,
                };
                if let Flow::Stop = flow {
                    break;
                }
                continue;
            }

            match decoder.decode_next() {
                Ok(Some(mut decoded)) => {
                    for sample in &mut decoded.samples {
                        *sample *= self.volume;
                    }
                    let frames = decoded.frames();
                    self.position += decoded.duration_secs();

                    if let Err(e) = output.write(decoded.samples, frames, decoded.spec.rate) {
                        self.fail(&url, e.to_string());
                        break;
                    }

                    if last_update.elapsed() >= TIME_UPDATE_INTERVAL {
                        last_update = Instant::now();
                        self.sink.emit(MediaEventKind::TimeUpdate {
                            position_secs: self.position,
                        });
                    }
                }
                Ok(None) => {
                    log::info!("Playback of {} finished", url);
                    self.set_playing(false);
                    let length = declared.unwrap_or(self.position).max(self.position);
                    if declared.is_none() {
                        // Header had no frame count; the walk through the stream measured it
                        self.sink.emit(MediaEventKind::MetadataLoaded {
                            duration_secs: length,
                        });
                    }
                    self.sink.emit(MediaEventKind::TimeUpdate {
                        position_secs: length,
                    });
                    self.sink.emit(MediaEventKind::Ended);
                    if let Err(e) = decoder.seek(0.0) {
                        log::warn!("Cannot rewind {}: {}", url, e);
                    }
                    self.position = 0.0;
                }
                Err(e) => {
                    self.fail(&url, e.to_string());
                    break;
                }
            }
        }

        log::debug!("Playback thread for {} exiting", url);
    }

    fn seek(&mut self, decoder: &mut AudioDecoder, position_secs: f64) {
        match decoder.seek(position_secs) {
            Ok(()) => {
                self.position = position_secs;
                self.sink.emit(MediaEventKind::TimeUpdate { position_secs });
            }
            Err(e) => log::warn!("Seek to {:.1}s failed: {}", position_secs, e),
        }
    }
}
