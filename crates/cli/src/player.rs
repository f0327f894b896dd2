// FILE: crates/cli/src/player.rs
//! Interactive terminal player

use crate::context::AppContext;
use anyhow::{bail, Context, Result};
use console::{style, Key, Term};
use media_engine::{
    CoursePlayer, Navigator, PlaybackController, PlayerState, PlayerView, StaticSessionGate,
    StreamingBackend,
};
use securgeek_core::{LessonId, UserIdentity};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

const BAR_WIDTH: usize = 50;

/// Prints the sign-in location instead of opening it
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn redirect(&self, target: &str) {
        eprintln!(
            "{} Sign-in required. Continue at {}",
            style("!").yellow().bold(),
            style(target).underlined()
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

struct Controls {
    skip_secs: f64,
    volume_step: f32,
}

pub async fn run(ctx: &AppContext, lesson: Option<u32>, user: Option<String>) -> Result<()> {
    let catalog = ctx.load_catalog()?;
    let backend = StreamingBackend::new(ctx.client()?, ctx.resolver()?)
        .context("Failed to create the audio backend")?;
    let controller = PlaybackController::new(
        Arc::new(backend),
        Arc::new(ctx.validator()?),
        ctx.controller_config(),
    );

    let identity = user
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .map(UserIdentity::new);
    let mut player = CoursePlayer::new(
        catalog,
        controller,
        Arc::new(StaticSessionGate::new(identity)),
        Arc::new(TerminalNavigator),
        Arc::new(ctx.prober()?),
        ctx.config.player.redirect_target.clone(),
    );

    if let Err(e) = player.mount().await {
        bail!("{}", e.user_message());
    }
    if let Some(id) = lesson {
        player
            .select_lesson(LessonId::new(id))
            .await
            .with_context(|| format!("Cannot start lesson {}", id))?;
    }

    let controls = Controls {
        skip_secs: ctx.config.player.skip_step().as_secs_f64(),
        volume_step: f32::from(ctx.config.player.volume_step) / 100.0,
    };

    let term = Term::stdout();
    if term.hide_cursor().is_err() {
        eprintln!("Warning: Failed to hide cursor");
    }
    let result = player_loop(&term, &mut player, &controls).await;
    let _ = term.show_cursor();
    result
}

/// Reads keys on a blocking thread; the channel closes when the loop exits
fn spawn_key_reader() -> mpsc::UnboundedReceiver<Key> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let term = Term::stdout();
        while let Ok(key) = term.read_key() {
            if tx.send(key).is_err() {
                break;
            }
        }
    });
    rx
}

async fn player_loop(term: &Term, player: &mut CoursePlayer, controls: &Controls) -> Result<()> {
    let mut keys = spawn_key_reader();
    let mut redraw = interval(Duration::from_millis(250));

    loop {
        tokio::select! {
            key = keys.recv() => {
                let Some(key) = key else { break };
                if handle_key(player, key, controls).await? == Flow::Quit {
                    break;
                }
            }
            update = player.pump() => log::trace!("{:?}", update),
            _ = redraw.tick() => {}
        }
        draw(term, &player.view())?;
    }

    Ok(())
}

async fn handle_key(player: &mut CoursePlayer, key: Key, controls: &Controls) -> Result<Flow> {
    match key {
        Key::Char('q') | Key::Escape => {
            player.controller_mut().teardown();
            return Ok(Flow::Quit);
        }
        Key::Char(' ') => player.controller_mut().toggle_play_pause(),
        Key::ArrowLeft => player.controller_mut().skip(-controls.skip_secs),
        Key::ArrowRight => player.controller_mut().skip(controls.skip_secs),
        Key::Char('+') | Key::Char('=') => {
            let volume = player.session().volume + controls.volume_step;
            player.controller_mut().set_volume(volume);
        }
        Key::Char('-') | Key::Char('_') => {
            let volume = player.session().volume - controls.volume_step;
            player.controller_mut().set_volume(volume);
        }
        Key::Char('n') => {
            player.next_lesson().await?;
        }
        Key::Char('r') => player.retry().await?,
        _ => {}
    }
    Ok(Flow::Continue)
}

fn draw(term: &Term, view: &PlayerView) -> Result<()> {
    term.clear_screen().context("Failed to clear screen")?;
    for line in render(view) {
        term.write_line(&line).context("Failed to write player")?;
    }
    Ok(())
}

/// Player screen as lines of styled text
fn render(view: &PlayerView) -> Vec<String> {
    let mut lines = Vec::new();

    let title = view
        .active_lesson
        .as_ref()
        .map(|l| l.title.as_str())
        .unwrap_or("No lesson selected");
    lines.push(format!("\n  {}", style(title).bold().cyan()));
    if let Some(email) = &view.user_email {
        lines.push(format!("  signed in as {}", style(email).dim()));
    }
    lines.push(String::new());

    if view.loading {
        lines.push(format!("  {}", style("Loading lesson...").yellow()));
    } else {
        lines.push(format!("  {} / {}", view.current_time, view.total_duration));
    }
    lines.push(format!(
        "  {} {:.0}%",
        progress_bar(view.progress_percentage, BAR_WIDTH),
        view.progress_percentage
    ));
    lines.push(String::new());

    let status = match view.state {
        PlayerState::Playing => style("Playing").green(),
        PlayerState::Paused => style("Paused").yellow(),
        PlayerState::Ended => style("Ended").blue(),
        PlayerState::Error => style("Error").red(),
        PlayerState::Loading => style("Loading").yellow(),
        PlayerState::Idle => style("Idle").dim(),
    };
    let buffering = if view.is_buffering && !view.loading {
        " (buffering)"
    } else {
        ""
    };
    lines.push(format!("  Status: {}{}", status, buffering));
    lines.push(format!("  Volume: {}%", volume_percent(view.volume)));

    if let Some(error) = &view.error {
        lines.push(String::new());
        let retry = if error.can_retry { "  [r] Retry" } else { "" };
        lines.push(format!("  {}{}", style(&error.message).red(), retry));
    }

    lines.push(String::new());
    for module in &view.modules {
        let measured = module.measured_duration.as_deref().unwrap_or("--:--");
        lines.push(format!(
            "  {} ({})",
            style(&module.title).bold(),
            measured
        ));
        for lesson in &module.lessons {
            let marker = if lesson.active { "▶" } else { " " };
            lines.push(format!("   {} {:<48} {:>6}", marker, lesson.title, lesson.duration));
        }
    }

    lines.push(String::new());
    lines.push("  Space play/pause   ←/→ skip   +/- volume   n next   r retry   q quit".to_string());
    lines
}

fn progress_bar(percent: f32, width: usize) -> String {
    let percent = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let filled = ((percent / 100.0) * width as f32).round() as usize;
    let filled = filled.min(width);
    format!("[{}{}]", "=".repeat(filled), " ".repeat(width - filled))
}

fn volume_percent(volume: f32) -> u8 {
    (volume.clamp(0.0, 1.0) * 100.0).round() as u8
}
