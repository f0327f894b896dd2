//! Course player host
//!
//! Wires the session gate, catalog, duration probes, progress aggregator and
//! playback controller together and renders a view snapshot.

use crate::controller::{Dispatch, PlaybackController};
use crate::duration::{DurationCache, DurationProber};
use crate::error::PlaybackError;
use crate::progress::ProgressAggregator;
use crate::state::{PlaybackSession, PlayerState};
use securgeek_core::{format_clock, AppError, Catalog, LessonId, ModuleId, UserIdentity};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;

/// Source of the signed-in identity
pub trait SessionGate: Send + Sync {
    fn current_user(&self) -> Option<UserIdentity>;
}

/// Redirect capability of the hosting surface
pub trait Navigator: Send + Sync {
    fn redirect(&self, target: &str);
}

/// Session gate holding an identity set by the host
#[derive(Debug, Default)]
pub struct StaticSessionGate {
    user: RwLock<Option<UserIdentity>>,
}

impl StaticSessionGate {
    pub fn new(user: Option<UserIdentity>) -> Self {
        Self {
            user: RwLock::new(user),
        }
    }

    pub fn sign_in(&self, user: UserIdentity) {
        if let Ok(mut slot) = self.user.write() {
            *slot = Some(user);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut slot) = self.user.write() {
            *slot = None;
        }
    }
}

impl SessionGate for StaticSessionGate {
    fn current_user(&self) -> Option<UserIdentity> {
        self.user.read().ok().and_then(|user| user.clone())
    }
}

/// Something that happened while pumping the player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerUpdate {
    Engine(Dispatch),
    DurationResolved { lesson: LessonId, display: String },
}

struct ProbeResult {
    resource_url: String,
    seconds: Option<f64>,
}

pub struct CoursePlayer {
    catalog: Catalog,
    controller: PlaybackController,
    gate: Arc<dyn SessionGate>,
    navigator: Arc<dyn Navigator>,
    prober: Arc<dyn DurationProber>,
    redirect_target: String,
    durations: DurationCache,
    progress: ProgressAggregator,
    user: Option<UserIdentity>,
    probes: JoinSet<()>,
    probe_tx: UnboundedSender<ProbeResult>,
    probe_rx: UnboundedReceiver<ProbeResult>,
}

impl CoursePlayer {
    pub fn new(
        catalog: Catalog,
        controller: PlaybackController,
        gate: Arc<dyn SessionGate>,
        navigator: Arc<dyn Navigator>,
        prober: Arc<dyn DurationProber>,
        redirect_target: impl Into<String>,
    ) -> Self {
        let (probe_tx, probe_rx) = mpsc::unbounded_channel();
        let progress = ProgressAggregator::new(&catalog);
        Self {
            catalog,
            controller,
            gate,
            navigator,
            prober,
            redirect_target: redirect_target.into(),
            durations: DurationCache::new(),
            progress,
            user: None,
            probes: JoinSet::new(),
            probe_tx,
            probe_rx,
        }
    }

    /// Checks the gate, starts duration probes and selects the first lesson.
    ///
    /// Without an identity the navigator is sent to the redirect target and
    /// nothing is loaded.
    pub async fn mount(&mut self) -> Result<(), AppError> {
        self.require_user()?;
        self.start_probes();
        if let Some(first) = self.catalog.first_lesson().cloned() {
            self.controller.select_lesson(&first).await;
        }
        Ok(())
    }

    /// Re-reads the gate after a sign-in or sign-out
    pub async fn on_identity_changed(&mut self) -> Result<(), AppError> {
        let was_signed_in = self.user.is_some();
        match self.require_user() {
            Ok(()) if !was_signed_in => self.mount().await,
            Ok(()) => Ok(()),
            Err(e) => {
                if was_signed_in {
                    log::info!("Signed out, tearing down playback");
                }
                self.controller.teardown();
                self.probes.abort_all();
                Err(e)
            }
        }
    }

    pub async fn select_lesson(&mut self, lesson_id: LessonId) -> Result<(), AppError> {
        self.ensure_signed_in()?;
        let lesson = self
            .catalog
            .lesson(lesson_id)
            .cloned()
            .ok_or(AppError::LessonNotFound {
                id: lesson_id.value(),
            })?;
        self.controller.select_lesson(&lesson).await;
        Ok(())
    }

    /// Selects the lesson after the active one; `Ok(false)` at the end of the course
    pub async fn next_lesson(&mut self) -> Result<bool, AppError> {
        self.ensure_signed_in()?;
        let Some(current) = self.controller.session().active_lesson_id else {
            return Ok(false);
        };
        match self.catalog.next_lesson(current).cloned() {
            Some(next) => {
                self.controller.select_lesson(&next).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn retry(&mut self) -> Result<(), AppError> {
        self.ensure_signed_in()?;
        self.controller.retry().await;
        Ok(())
    }

    /// Waits for the next probe result or engine event and applies it
    pub async fn pump(&mut self) -> PlayerUpdate {
        tokio::select! {
            Some(result) = self.probe_rx.recv() => self.apply_probe(result),
            dispatch = self.controller.pump() => self.apply_dispatch(dispatch),
        }
    }

    /// Applies everything already queued without waiting
    pub fn poll(&mut self) -> Vec<PlayerUpdate> {
        let mut updates = Vec::new();
        while let Ok(result) = self.probe_rx.try_recv() {
            updates.push(self.apply_probe(result));
        }
        for dispatch in self.controller.poll_events() {
            updates.push(self.apply_dispatch(dispatch));
        }
        updates
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlaybackController {
        &mut self.controller
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn durations(&self) -> &DurationCache {
        &self.durations
    }

    pub fn progress(&self) -> &ProgressAggregator {
        &self.progress
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    /// Render snapshot
    pub fn view(&self) -> PlayerView {
        let session = self.controller.session();
        let active = session.active_lesson_id;

        let modules = self
            .catalog
            .modules()
            .iter()
            .map(|module| ModuleView {
                id: module.id,
                title: module.title.clone(),
                declared_duration: module.declared_duration.clone(),
                measured_duration: self.progress.module_total_display(module.id),
                completed: module.completed,
                lessons: module
                    .lessons
                    .iter()
                    .map(|lesson| LessonView {
                        id: lesson.id,
                        title: lesson.title.clone(),
                        declared_duration: lesson.declared_duration.clone(),
                        duration: self.durations.get(&lesson.resource_url).to_string(),
                        completed: lesson.completed,
                        active: active == Some(lesson.id),
                    })
                    .collect(),
            })
            .collect();

        PlayerView {
            user_email: self.user.as_ref().map(|u| u.email.clone()),
            active_lesson: active.and_then(|id| self.catalog.lesson(id)).map(|l| ActiveLessonView {
                id: l.id,
                title: l.title.clone(),
            }),
            state: session.state,
            current_time: format_clock(session.current_time_secs),
            total_duration: format_clock(session.total_duration_secs),
            progress_percentage: session.progress_percentage(),
            is_playing: session.is_playing,
            is_buffering: session.is_buffering,
            loading: session.state == PlayerState::Loading,
            volume: session.volume,
            error: session.last_error.as_ref().map(ErrorPanel::from),
            modules,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        self.controller.session()
    }

    fn require_user(&mut self) -> Result<(), AppError> {
        self.user = self.gate.current_user();
        if self.user.is_none() {
            log::info!("No signed-in user, redirecting to {}", self.redirect_target);
            self.navigator.redirect(&self.redirect_target);
            return Err(PlaybackError::Unauthenticated.into());
        }
        Ok(())
    }

    fn ensure_signed_in(&self) -> Result<(), AppError> {
        if self.user.is_none() {
            return Err(AppError::Unauthenticated);
        }
        Ok(())
    }

    fn start_probes(&mut self) {
        let mut seen = HashSet::new();
        for (_, lesson) in self.catalog.lessons() {
            if !seen.insert(lesson.resource_url.clone()) {
                continue;
            }
            let prober = self.prober.clone();
            let tx = self.probe_tx.clone();
            let resource_url = lesson.resource_url.clone();
            self.probes.spawn(async move {
                let seconds = prober.probe_seconds(&resource_url).await;
                let _ = tx.send(ProbeResult {
                    resource_url,
                    seconds,
                });
            });
        }
        log::debug!("Started {} duration probes", seen.len());
    }

    fn apply_probe(&mut self, result: ProbeResult) -> PlayerUpdate {
        let display = match result.seconds {
            Some(secs) => format_clock(secs),
            None => securgeek_core::UNRESOLVED_DURATION.to_string(),
        };
        self.durations.insert(result.resource_url.clone(), display.clone());

        let mut first = None;
        for (_, lesson) in self.catalog.lessons() {
            if lesson.resource_url != result.resource_url {
                continue;
            }
            if let Some(secs) = result.seconds {
                self.progress.record(lesson.id, secs);
            }
            first.get_or_insert(lesson.id);
        }

        match first {
            Some(lesson) => PlayerUpdate::DurationResolved { lesson, display },
            None => PlayerUpdate::Engine(Dispatch::Stale),
        }
    }

    fn apply_dispatch(&mut self, dispatch: Dispatch) -> PlayerUpdate {
        if let Dispatch::DurationKnown { lesson, seconds } = &dispatch {
            self.progress.record(*lesson, *seconds);
            if let Some(l) = self.catalog.lesson(*lesson) {
                self.durations
                    .insert(l.resource_url.clone(), format_clock(*seconds));
            }
        }
        PlayerUpdate::Engine(dispatch)
    }
}

/// Everything a front end needs to draw the player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub user_email: Option<String>,
    pub active_lesson: Option<ActiveLessonView>,
    pub state: PlayerState,
    pub current_time: String,
    pub total_duration: String,
    pub progress_percentage: f32,
    pub is_playing: bool,
    pub is_buffering: bool,
    /// Blocking loading indicator
    pub loading: bool,
    pub volume: f32,
    pub error: Option<ErrorPanel>,
    pub modules: Vec<ModuleView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveLessonView {
    pub id: LessonId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPanel {
    pub error: PlaybackError,
    pub message: String,
    pub can_retry: bool,
}

impl From<&PlaybackError> for ErrorPanel {
    fn from(error: &PlaybackError) -> Self {
        Self {
            error: error.clone(),
            message: error.user_message(),
            can_retry: error.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleView {
    pub id: ModuleId,
    pub title: String,
    pub declared_duration: String,
    /// Sum of measured lesson lengths, once any is known
    pub measured_duration: Option<String>,
    pub completed: bool,
    pub lessons: Vec<LessonView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonView {
    pub id: LessonId,
    pub title: String,
    pub declared_duration: String,
    /// Probed length or the `--:--` placeholder
    pub duration: String,
    pub completed: bool,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_gate_sign_in_out() {
        let gate = StaticSessionGate::new(None);
        assert!(gate.current_user().is_none());

        gate.sign_in(UserIdentity::new("learner@example.com"));
        assert_eq!(
            gate.current_user().map(|u| u.email),
            Some("learner@example.com".to_string())
        );

        gate.sign_out();
        assert!(gate.current_user().is_none());
    }

    #[test]
    fn test_error_panel_from_error() {
        let panel = ErrorPanel::from(&PlaybackError::LoadTimeout { seconds: 10 });
        assert!(panel.can_retry);
        assert!(panel.message.contains("too long"));
    }
}
