//! Playback controller
//!
//! Owns at most one live [`AudioHandle`]. Selecting a lesson releases the
//! previous handle before validation or acquisition of the next one, and
//! every media event passes through [`PlaybackController::handle_event`],
//! which discards events whose handle is no longer live.

use crate::backend::{AudioBackend, AudioHandle};
use crate::error::PlaybackError;
use crate::events::{EventSink, HandleId, MediaEvent, MediaEventKind};
use crate::state::{clamp_position, clamp_volume, PlaybackSession, PlayerState};
use securgeek_core::{Lesson, LessonId};
use securgeek_network::ResourceValidator;
use securgeek_resilience::Deadline;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Controller settings
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Budget for a selected lesson to become ready
    pub load_timeout: Duration,
    /// Volume in `[0, 1]` for the first handle
    pub initial_volume: f32,
    /// Start playing as soon as the lesson is ready
    pub autoplay: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_secs(10),
            initial_volume: 1.0,
            autoplay: false,
        }
    }
}

/// What a dispatched event or timeout did to the session
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The event came from a released handle and was dropped
    Stale,
    /// The session was updated
    Applied,
    /// Metadata gave the real duration of the active lesson
    DurationKnown { lesson: LessonId, seconds: f64 },
    /// The load deadline passed and the handle was released
    TimedOut,
}

struct LiveHandle {
    id: HandleId,
    inner: Box<dyn AudioHandle>,
}

pub struct PlaybackController {
    backend: Arc<dyn AudioBackend>,
    validator: Arc<dyn ResourceValidator>,
    config: ControllerConfig,
    session: PlaybackSession,
    handle: Option<LiveHandle>,
    /// Lesson of the most recent select, successful or not; target of retry
    last_attempt: Option<Lesson>,
    load_deadline: Option<Deadline>,
    play_when_ready: bool,
    next_handle: u64,
    events_tx: UnboundedSender<MediaEvent>,
    events_rx: UnboundedReceiver<MediaEvent>,
}

impl PlaybackController {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        validator: Arc<dyn ResourceValidator>,
        config: ControllerConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = PlaybackSession::new(config.initial_volume);
        Self {
            backend,
            validator,
            config,
            session,
            handle: None,
            last_attempt: None,
            load_deadline: None,
            play_when_ready: false,
            next_handle: 1,
            events_tx,
            events_rx,
        }
    }

    /// Current session snapshot
    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn state(&self) -> PlayerState {
        self.session.state
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Lesson that `retry` would reload
    pub fn last_attempt(&self) -> Option<&Lesson> {
        self.last_attempt.as_ref()
    }

    /// Selects a lesson for playback.
    ///
    /// Does nothing if the lesson is already active on a healthy handle.
    /// Otherwise the current handle is released, the resource validated and
    /// a new handle opened in `Loading`.
    pub async fn select_lesson(&mut self, lesson: &Lesson) {
        if self.session.active_lesson_id == Some(lesson.id)
            && self.handle.is_some()
            && self.session.state != PlayerState::Error
        {
            log::debug!("Lesson {} already active", lesson.id);
            return;
        }

        self.release_handle();
        self.last_attempt = Some(lesson.clone());
        self.session.last_error = None;

        if !self.validator.validate(&lesson.resource_url).await {
            log::warn!(
                "Lesson {} resource {} failed validation",
                lesson.id,
                lesson.resource_url
            );
            self.fail(PlaybackError::ResourceNotFound {
                url: lesson.resource_url.clone(),
            });
            return;
        }

        let id = HandleId::new(self.next_handle);
        self.next_handle += 1;
        let sink = EventSink::new(id, self.events_tx.clone());

        match self
            .backend
            .open(&lesson.resource_url, self.session.volume, sink)
        {
            Ok(inner) => {
                log::info!("Loading lesson {} on handle {}", lesson.id, id);
                self.handle = Some(LiveHandle { id, inner });
                self.session.handle = Some(id);
                self.session.active_lesson_id = Some(lesson.id);
                self.session.current_time_secs = 0.0;
                self.session.total_duration_secs = 0.0;
                self.session.is_buffering = true;
                self.session.state = PlayerState::Loading;
                self.play_when_ready = self.config.autoplay;
                self.load_deadline = Some(Deadline::after(self.config.load_timeout));
            }
            Err(e) => {
                log::warn!("Failed to open lesson {}: {}", lesson.id, e);
                self.fail(PlaybackError::DecodeOrTransportError {
                    message: e.to_string(),
                });
            }
        }
    }

    /// Reloads the current or last attempted lesson
    pub async fn retry(&mut self) {
        match self.last_attempt.clone() {
            Some(lesson) => {
                log::info!("Retrying lesson {}", lesson.id);
                self.select_lesson(&lesson).await;
            }
            None => log::debug!("Nothing to retry"),
        }
    }

    pub fn play(&mut self) {
        match self.session.state {
            PlayerState::Playing => {}
            PlayerState::Loading => self.play_when_ready = true,
            PlayerState::Paused | PlayerState::Ended => self.start_playback(),
            PlayerState::Idle | PlayerState::Error => {
                log::debug!("play() ignored in state {}", self.session.state);
            }
        }
    }

    pub fn pause(&mut self) {
        match self.session.state {
            PlayerState::Playing => {
                if let Some(live) = self.handle.as_mut() {
                    if let Err(e) = live.inner.pause() {
                        log::warn!("Pause failed on handle {}: {}", live.id, e);
                    }
                }
                self.session.is_playing = false;
                self.session.state = PlayerState::Paused;
            }
            PlayerState::Loading => self.play_when_ready = false,
            _ => {}
        }
    }

    pub fn toggle_play_pause(&mut self) {
        if self.session.is_playing || self.play_when_ready {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Moves to `position_secs`, clamped to the known duration
    pub fn seek(&mut self, position_secs: f64) {
        if self.session.state == PlayerState::Error || !self.session.is_duration_known() {
            return;
        }
        let Some(live) = self.handle.as_mut() else {
            return;
        };

        let target = clamp_position(position_secs, self.session.total_duration_secs);
        match live.inner.seek(target) {
            Ok(()) => {
                self.session.current_time_secs = target;
                if self.session.state == PlayerState::Ended {
                    self.session.state = PlayerState::Paused;
                }
            }
            Err(e) => log::warn!("Seek failed on handle {}: {}", live.id, e),
        }
    }

    pub fn skip(&mut self, delta_secs: f64) {
        self.seek(self.session.current_time_secs + delta_secs);
    }

    /// Sets the volume, kept for later handles when none is live
    pub fn set_volume(&mut self, volume: f32) {
        self.session.volume = clamp_volume(volume, self.session.volume);
        if let Some(live) = self.handle.as_mut() {
            if let Err(e) = live.inner.set_volume(self.session.volume) {
                log::warn!("Volume change failed on handle {}: {}", live.id, e);
            }
        }
    }

    /// Applies one event if it belongs to the live handle
    pub fn handle_event(&mut self, event: MediaEvent) -> Dispatch {
        let live_id = match &self.handle {
            Some(live) if live.id == event.handle => live.id,
            _ => {
                log::trace!("Dropping {:?} from stale handle {}", event.kind, event.handle);
                return Dispatch::Stale;
            }
        };

        match event.kind {
            MediaEventKind::MetadataLoaded { duration_secs } => {
                let seconds = if duration_secs.is_finite() {
                    duration_secs.max(0.0)
                } else {
                    0.0
                };
                self.session.total_duration_secs = seconds;
                self.session.current_time_secs =
                    clamp_position(self.session.current_time_secs, seconds);
                self.mark_ready();

                match self.session.active_lesson_id {
                    Some(lesson) if seconds > 0.0 => Dispatch::DurationKnown { lesson, seconds },
                    _ => Dispatch::Applied,
                }
            }
            MediaEventKind::CanPlay => {
                self.mark_ready();
                Dispatch::Applied
            }
            MediaEventKind::Waiting => {
                self.session.is_buffering = true;
                Dispatch::Applied
            }
            MediaEventKind::Playing => {
                self.session.is_buffering = false;
                Dispatch::Applied
            }
            MediaEventKind::TimeUpdate { position_secs } => {
                if matches!(
                    self.session.state,
                    PlayerState::Playing | PlayerState::Paused
                ) {
                    self.session.current_time_secs = if self.session.is_duration_known() {
                        clamp_position(position_secs, self.session.total_duration_secs)
                    } else {
                        clamp_position(position_secs, f64::MAX)
                    };
                }
                Dispatch::Applied
            }
            MediaEventKind::Ended => {
                log::info!("Handle {} reached the end", live_id);
                self.session.is_playing = false;
                self.session.is_buffering = false;
                self.session.current_time_secs = 0.0;
                self.session.state = PlayerState::Ended;
                Dispatch::Applied
            }
            MediaEventKind::Error { message } => {
                log::warn!("Handle {} failed: {}", live_id, message);
                self.fail(PlaybackError::DecodeOrTransportError { message });
                Dispatch::Applied
            }
        }
    }

    /// Waits for the next event or the load deadline and applies it
    pub async fn pump(&mut self) -> Dispatch {
        let received = match self.load_deadline {
            Some(deadline) => tokio::select! {
                event = self.events_rx.recv() => event,
                _ = deadline.elapsed() => None,
            },
            None => self.events_rx.recv().await,
        };

        match received {
            Some(event) => self.handle_event(event),
            None => self.expire_load(),
        }
    }

    /// Applies every queued event without waiting, then checks the deadline.
    /// Returns what each step did.
    pub fn poll_events(&mut self) -> Vec<Dispatch> {
        let mut applied = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            applied.push(self.handle_event(event));
        }
        if self.load_deadline.is_some_and(|d| d.is_expired()) {
            applied.push(self.expire_load());
        }
        applied
    }

    /// Releases the handle and returns to `Idle`
    pub fn teardown(&mut self) {
        self.release_handle();
        self.session = PlaybackSession::new(self.session.volume);
        self.last_attempt = None;
    }

    fn mark_ready(&mut self) {
        if self.session.state != PlayerState::Loading {
            return;
        }
        self.load_deadline = None;
        self.session.is_buffering = false;
        self.session.state = PlayerState::Paused;
        if std::mem::take(&mut self.play_when_ready) {
            self.start_playback();
        }
    }

    fn start_playback(&mut self) {
        let Some(live) = self.handle.as_mut() else {
            return;
        };
        match live.inner.play() {
            Ok(()) => {
                self.session.is_playing = true;
                self.session.state = PlayerState::Playing;
                self.session.last_error = None;
            }
            Err(e) => {
                log::warn!("Play failed on handle {}: {}", live.id, e);
                self.session.is_playing = false;
                self.session.state = PlayerState::Paused;
                self.session.last_error = Some(PlaybackError::PlaybackStartFailure {
                    message: e.to_string(),
                });
            }
        }
    }

    fn expire_load(&mut self) -> Dispatch {
        let seconds = self.config.load_timeout.as_secs();
        log::warn!(
            "Lesson {:?} not ready after {}s, releasing handle",
            self.session.active_lesson_id,
            seconds
        );
        self.release_handle();
        self.fail(PlaybackError::LoadTimeout { seconds });
        Dispatch::TimedOut
    }

    fn fail(&mut self, error: PlaybackError) {
        self.load_deadline = None;
        self.play_when_ready = false;
        self.session.is_playing = false;
        self.session.is_buffering = false;
        self.session.state = PlayerState::Error;
        self.session.last_error = Some(error);
    }

    fn release_handle(&mut self) {
        self.load_deadline = None;
        self.play_when_ready = false;
        self.session.is_playing = false;
        self.session.is_buffering = false;
        self.session.handle = None;
        if let Some(mut live) = self.handle.take() {
            if let Err(e) = live.inner.pause() {
                log::debug!("Pause before release failed on handle {}: {}", live.id, e);
            }
            live.inner.release();
            log::debug!("Released handle {}", live.id);
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.release_handle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, EngineResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Calls {
        opened: Vec<(String, EventSink)>,
        plays: usize,
        seeks: Vec<f64>,
        released: usize,
    }

    struct FakeBackend {
        calls: Arc<Mutex<Calls>>,
        fail_play: bool,
    }

    struct FakeHandle {
        calls: Arc<Mutex<Calls>>,
        fail_play: bool,
    }

    impl AudioBackend for FakeBackend {
        fn open(
            &self,
            resource_url: &str,
            _volume: f32,
            sink: EventSink,
        ) -> EngineResult<Box<dyn AudioHandle>> {
            self.calls
                .lock()
                .unwrap()
                .opened
                .push((resource_url.to_string(), sink));
            Ok(Box::new(FakeHandle {
                calls: self.calls.clone(),
                fail_play: self.fail_play,
            }))
        }
    }

    impl AudioHandle for FakeHandle {
        fn play(&mut self) -> EngineResult<()> {
            if self.fail_play {
                return Err(EngineError::OutputError("device busy".to_string()));
            }
            self.calls.lock().unwrap().plays += 1;
            Ok(())
        }
        fn pause(&mut self) -> EngineResult<()> {
            Ok(())
        }
        fn seek(&mut self, position_secs: f64) -> EngineResult<()> {
            self.calls.lock().unwrap().seeks.push(position_secs);
            Ok(())
        }
        fn set_volume(&mut self, _volume: f32) -> EngineResult<()> {
            Ok(())
        }
        fn release(&mut self) {
            self.calls.lock().unwrap().released += 1;
        }
    }

    struct AlwaysValid;

    #[async_trait]
    impl ResourceValidator for AlwaysValid {
        async fn validate(&self, _resource_url: &str) -> bool {
            true
        }
    }

    fn controller(fail_play: bool, config: ControllerConfig) -> (PlaybackController, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let backend = FakeBackend {
            calls: calls.clone(),
            fail_play,
        };
        let controller = PlaybackController::new(Arc::new(backend), Arc::new(AlwaysValid), config);
        (controller, calls)
    }

    fn lesson(id: u32) -> Lesson {
        Lesson::new(id, format!("Lesson {}", id), "1:00", format!("/audios/{}.mp3", id))
    }

    fn emit_last(calls: &Arc<Mutex<Calls>>, kind: MediaEventKind) {
        let calls = calls.lock().unwrap();
        let (_, sink) = calls.opened.last().unwrap();
        sink.emit(kind);
    }

    #[tokio::test]
    async fn test_ready_enters_paused() {
        let (mut controller, calls) = controller(false, ControllerConfig::default());
        controller.select_lesson(&lesson(1)).await;
        assert_eq!(controller.state(), PlayerState::Loading);
        assert!(controller.session().is_buffering);

        emit_last(&calls, MediaEventKind::MetadataLoaded { duration_secs: 90.0 });
        let dispatched = controller.poll_events();
        assert_eq!(
            dispatched,
            vec![Dispatch::DurationKnown {
                lesson: LessonId::new(1),
                seconds: 90.0
            }]
        );
        assert_eq!(controller.state(), PlayerState::Paused);
        assert!(!controller.session().is_playing);
    }

    #[tokio::test]
    async fn test_play_during_loading_waits_for_ready() {
        let (mut controller, calls) = controller(false, ControllerConfig::default());
        controller.select_lesson(&lesson(1)).await;
        controller.play();
        assert_eq!(calls.lock().unwrap().plays, 0);

        emit_last(&calls, MediaEventKind::CanPlay);
        controller.poll_events();
        assert_eq!(calls.lock().unwrap().plays, 1);
        assert_eq!(controller.state(), PlayerState::Playing);
    }

    #[tokio::test]
    async fn test_buffering_overlaps_playing() {
        let (mut controller, calls) = controller(false, ControllerConfig::default());
        controller.select_lesson(&lesson(1)).await;
        emit_last(&calls, MediaEventKind::MetadataLoaded { duration_secs: 90.0 });
        controller.poll_events();
        controller.play();
        emit_last(&calls, MediaEventKind::TimeUpdate { position_secs: 12.0 });
        controller.poll_events();
        assert!(!controller.session().is_buffering);

        emit_last(&calls, MediaEventKind::Waiting);
        controller.poll_events();
        let session = controller.session();
        assert_eq!(session.state, PlayerState::Playing);
        assert!(session.is_playing);
        assert!(session.is_buffering);
        assert_eq!(session.current_time_secs, 12.0);

        emit_last(&calls, MediaEventKind::Playing);
        controller.poll_events();
        let session = controller.session();
        assert_eq!(session.state, PlayerState::Playing);
        assert!(!session.is_buffering);
    }

    #[tokio::test]
    async fn test_buffering_while_paused_keeps_state() {
        let (mut controller, calls) = controller(false, ControllerConfig::default());
        controller.select_lesson(&lesson(1)).await;
        emit_last(&calls, MediaEventKind::CanPlay);
        controller.poll_events();

        emit_last(&calls, MediaEventKind::Waiting);
        controller.poll_events();
        assert_eq!(controller.state(), PlayerState::Paused);
        assert!(controller.session().is_buffering);
    }

    #[tokio::test]
    async fn test_autoplay() {
        let config = ControllerConfig {
            autoplay: true,
            ..Default::default()
        };
        let (mut controller, calls) = controller(false, config);
        controller.select_lesson(&lesson(1)).await;
        emit_last(&calls, MediaEventKind::CanPlay);
        controller.poll_events();
        assert!(controller.session().is_playing);
    }

    #[tokio::test]
    async fn test_play_start_failure_keeps_handle() {
        let (mut controller, calls) = controller(true, ControllerConfig::default());
        controller.select_lesson(&lesson(1)).await;
        emit_last(&calls, MediaEventKind::CanPlay);
        controller.poll_events();

        controller.play();
        let session = controller.session();
        assert_eq!(session.state, PlayerState::Paused);
        assert!(session.has_live_handle());
        assert!(matches!(
            session.last_error,
            Some(PlaybackError::PlaybackStartFailure { .. })
        ));
        assert_eq!(calls.lock().unwrap().released, 0);
    }

    #[tokio::test]
    async fn test_seek_without_duration_is_ignored() {
        let (mut controller, calls) = controller(false, ControllerConfig::default());
        controller.seek(10.0);
        controller.select_lesson(&lesson(1)).await;
        emit_last(&calls, MediaEventKind::CanPlay);
        controller.poll_events();

        controller.seek(10.0);
        assert_eq!(controller.session().current_time_secs, 0.0);
        assert!(calls.lock().unwrap().seeks.is_empty());
    }

    #[tokio::test]
    async fn test_skip_clamps_both_ways() {
        let (mut controller, calls) = controller(false, ControllerConfig::default());
        controller.select_lesson(&lesson(1)).await;
        emit_last(&calls, MediaEventKind::MetadataLoaded { duration_secs: 60.0 });
        controller.poll_events();

        controller.skip(-10.0);
        assert_eq!(controller.session().current_time_secs, 0.0);
        controller.skip(45.0);
        controller.skip(45.0);
        assert_eq!(controller.session().current_time_secs, 60.0);
    }

    #[tokio::test]
    async fn test_ended_resets_time_and_keeps_handle() {
        let (mut controller, calls) = controller(false, ControllerConfig::default());
        controller.select_lesson(&lesson(1)).await;
        emit_last(&calls, MediaEventKind::MetadataLoaded { duration_secs: 60.0 });
        controller.poll_events();
        controller.play();
        emit_last(&calls, MediaEventKind::TimeUpdate { position_secs: 59.5 });
        emit_last(&calls, MediaEventKind::Ended);
        controller.poll_events();

        let session = controller.session();
        assert_eq!(session.state, PlayerState::Ended);
        assert_eq!(session.current_time_secs, 0.0);
        assert!(!session.is_playing);
        assert!(session.has_live_handle());

        controller.play();
        assert_eq!(controller.state(), PlayerState::Playing);
    }

    #[tokio::test]
    async fn test_volume_clamped_and_remembered() {
        let (mut controller, _calls) = controller(false, ControllerConfig::default());
        controller.set_volume(1.7);
        assert_eq!(controller.session().volume, 1.0);
        controller.set_volume(-0.2);
        assert_eq!(controller.session().volume, 0.0);
    }

    #[tokio::test]
    async fn test_teardown_releases() {
        let (mut controller, calls) = controller(false, ControllerConfig::default());
        controller.select_lesson(&lesson(1)).await;
        controller.teardown();
        assert_eq!(calls.lock().unwrap().released, 1);
        assert_eq!(controller.state(), PlayerState::Idle);
        assert!(controller.last_attempt().is_none());
    }

    #[tokio::test]
    async fn test_drop_releases() {
        let (mut controller, calls) = controller(false, ControllerConfig::default());
        controller.select_lesson(&lesson(1)).await;
        drop(controller);
        assert_eq!(calls.lock().unwrap().released, 1);
    }
}
