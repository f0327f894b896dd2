// FILE: crates/cli/src/commands.rs

use crate::context::AppContext;
use anyhow::{bail, Context, Result};
use console::style;
use media_engine::{DurationCache, DurationProber, ProgressAggregator};
use securgeek_core::{format_clock, Catalog, LessonId};
use securgeek_network::ResourceValidator;
use securgeek_relay::RelayState;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Print every module and lesson with probed durations
pub async fn list_catalog(ctx: &AppContext) -> Result<()> {
    let catalog = ctx.load_catalog()?;
    if catalog.is_empty() {
        println!("The catalog at {} has no lessons.", ctx.catalog_path.display());
        return Ok(());
    }

    let prober: Arc<dyn DurationProber> = Arc::new(ctx.prober()?);
    let (durations, progress) = probe_all(&catalog, prober).await;

    println!(
        "\n{} modules, {} lessons",
        style(catalog.modules().len()).bold().cyan(),
        style(catalog.lesson_count()).bold().cyan()
    );
    println!("{}", "=".repeat(80));
    for line in catalog_lines(&catalog, &durations, &progress) {
        println!("{}", line);
    }

    Ok(())
}

/// Probes each distinct resource once, concurrently
async fn probe_all(
    catalog: &Catalog,
    prober: Arc<dyn DurationProber>,
) -> (DurationCache, ProgressAggregator) {
    let mut probes = JoinSet::new();
    let mut seen = HashSet::new();
    for (_, lesson) in catalog.lessons() {
        if seen.insert(lesson.resource_url.clone()) {
            let prober = prober.clone();
            let url = lesson.resource_url.clone();
            probes.spawn(async move {
                let seconds = prober.probe_seconds(&url).await;
                (url, seconds)
            });
        }
    }

    let mut durations = DurationCache::new();
    let mut progress = ProgressAggregator::new(catalog);
    while let Some(joined) = probes.join_next().await {
        let (url, seconds) = match joined {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Duration probe task failed: {}", e);
                continue;
            }
        };
        let Some(seconds) = seconds else {
            continue;
        };
        durations.insert(url.clone(), format_clock(seconds));
        for (_, lesson) in catalog.lessons().filter(|(_, l)| l.resource_url == url) {
            progress.record(lesson.id, seconds);
        }
    }

    (durations, progress)
}

/// Text rows for the catalog listing
pub(crate) fn catalog_lines(
    catalog: &Catalog,
    durations: &DurationCache,
    progress: &ProgressAggregator,
) -> Vec<String> {
    let mut lines = Vec::new();
    for module in catalog.modules() {
        let measured = progress
            .module_total_display(module.id)
            .unwrap_or_else(|| securgeek_core::UNRESOLVED_DURATION.to_string());
        let done = if module.completed { " ✓" } else { "" };
        lines.push(format!(
            "Module {}: {} [{} declared, {} measured]{}",
            module.id, module.title, module.declared_duration, measured, done
        ));
        for lesson in &module.lessons {
            let done = if lesson.completed { " ✓" } else { "" };
            lines.push(format!(
                "  {:>3}. {:<48} {:>6}{}",
                lesson.id.value(),
                lesson.title,
                durations.get(&lesson.resource_url),
                done
            ));
        }
    }
    lines
}

/// Validate one lesson's audio; fails when unreachable
pub async fn check_lesson(ctx: &AppContext, lesson_id: u32) -> Result<()> {
    let catalog = ctx.load_catalog()?;
    let lesson = catalog
        .lesson(LessonId::new(lesson_id))
        .with_context(|| format!("Lesson {} is not in the catalog", lesson_id))?;

    let validator = ctx.validator()?;
    if validator.validate(&lesson.resource_url).await {
        println!(
            "{} {} ({})",
            style("✓").green().bold(),
            lesson.title,
            lesson.resource_url
        );
        Ok(())
    } else {
        println!(
            "{} {} ({})",
            style("✗").red().bold(),
            lesson.title,
            lesson.resource_url
        );
        bail!("Lesson {} audio is not reachable", lesson_id)
    }
}

/// Run the chat relay until Ctrl-C
pub async fn serve(ctx: &AppContext) -> Result<()> {
    let relay = ctx.config.relay.clone();
    let address = relay.listen_address();
    let state = RelayState::from_env(relay).context("Failed to set up the relay")?;

    println!("{} Relay starting on {}", style("▶").cyan(), address);
    securgeek_relay::serve(state)
        .await
        .context("Relay server failed")?;
    Ok(())
}

pub fn config_init(ctx: &AppContext) -> Result<()> {
    let created = ctx
        .manager
        .initialize()
        .context("Failed to write the default configuration")?;
    let path = ctx.manager.config_path();
    if created {
        println!("{} Created {}", style("✓").green().bold(), path.display());
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}

pub fn config_show(ctx: &AppContext, json: bool) -> Result<()> {
    let rendered = if json {
        ctx.config.to_json_string()
    } else {
        ctx.config.to_toml_string()
    }
    .context("Failed to render the configuration")?;

    println!("# {}", ctx.manager.config_path().display());
    println!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use securgeek_core::{Lesson, Module, ModuleId};

    struct FixedProber;

    #[async_trait]
    impl DurationProber for FixedProber {
        async fn probe_seconds(&self, resource_url: &str) -> Option<f64> {
            match resource_url {
                "/audios/1.1.mp3" => Some(900.0),
                "/audios/1.2.mp3" => Some(750.0),
                _ => None,
            }
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Module::new(1, "Introduction to Cybersecurity", "45 mins")
                .with_lesson(Lesson::new(1, "Understanding Cyber Threats", "15:00", "/audios/1.1.mp3"))
                .with_lesson(Lesson::new(2, "Basic Security Principles", "12:30", "/audios/1.2.mp3")),
            Module::new(2, "Social Engineering", "30 mins")
                .with_lesson(Lesson::new(3, "Phishing", "10:00", "/audios/2.1.mp3")),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_probe_all_fills_cache_and_totals() {
        let catalog = catalog();
        let (durations, progress) = probe_all(&catalog, Arc::new(FixedProber)).await;

        assert_eq!(durations.get("/audios/1.1.mp3"), "15:00");
        assert_eq!(durations.get("/audios/2.1.mp3"), "--:--");
        assert_eq!(progress.module_total(ModuleId::new(1)), 1650.0);
        assert!(progress.module_total_display(ModuleId::new(2)).is_none());
    }

    #[tokio::test]
    async fn test_catalog_lines() {
        let catalog = catalog();
        let (durations, progress) = probe_all(&catalog, Arc::new(FixedProber)).await;
        let lines = catalog_lines(&catalog, &durations, &progress);

        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("Introduction to Cybersecurity"));
        assert!(lines[0].contains("27:30 measured"));
        assert!(lines[1].contains("15:00"));
        assert!(lines[3].contains("--:-- measured"));
        assert!(lines[4].trim_end().ends_with("--:--"));
    }
}
