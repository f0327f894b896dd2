//! Real lesson durations
//!
//! Probes use their own short-lived download and decoder, never the
//! controller's handle. Only the container header is fetched when it
//! declares a frame count. Any failure resolves to [`UNRESOLVED_DURATION`].

use crate::decoder::measure_duration;
use crate::remote::open_remote;
use crate::stream::extension_of;
use async_trait::async_trait;
use securgeek_core::{format_clock, UNRESOLVED_DURATION};
use securgeek_network::{AssetResolver, Client};
use securgeek_resilience::with_timeout;
use std::collections::HashMap;
use std::time::Duration;
use tokio::runtime::Handle;

/// Measures how long a resource plays
#[async_trait]
pub trait DurationProber: Send + Sync {
    /// Length in seconds, `None` on any failure
    async fn probe_seconds(&self, resource_url: &str) -> Option<f64>;

    /// Length as `M:SS`, or the unresolved sentinel
    async fn probe(&self, resource_url: &str) -> String {
        match self.probe_seconds(resource_url).await {
            Some(secs) => format_clock(secs),
            None => UNRESOLVED_DURATION.to_string(),
        }
    }
}

/// Prober that streams the asset head and measures it with symphonia
#[derive(Clone)]
pub struct SymphoniaProber {
    client: Client,
    resolver: AssetResolver,
    timeout: Duration,
}

impl SymphoniaProber {
    pub fn new(client: Client, resolver: AssetResolver, timeout: Duration) -> Self {
        Self {
            client,
            resolver,
            timeout,
        }
    }
}

#[async_trait]
impl DurationProber for SymphoniaProber {
    async fn probe_seconds(&self, resource_url: &str) -> Option<f64> {
        let url = match self.resolver.resolve(resource_url) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Cannot probe {}: {}", resource_url, e);
                return None;
            }
        };

        let extension = extension_of(&url);
        let (source, mut remote) = open_remote(self.client.clone(), url.clone(), &Handle::current());
        let measuring = tokio::task::spawn_blocking(move || {
            measure_duration(Box::new(source), extension.as_deref())
        });
        let measured = with_timeout(self.timeout, measuring).await;
        // Stops the download and unblocks a measurement still waiting on it
        remote.release();

        match measured {
            Ok(Ok(Ok(secs))) => {
                log::debug!("Probed {} at {:.1}s", url, secs);
                Some(secs)
            }
            Ok(Ok(Err(e))) => {
                log::warn!("Cannot measure {}: {}", url, e);
                None
            }
            Ok(Err(e)) => {
                log::error!("Probe task for {} panicked: {}", url, e);
                None
            }
            Err(e) => {
                log::warn!("Probe of {} gave up: {}", url, e);
                None
            }
        }
    }
}

/// `resource URL -> display duration`, filled lazily
#[derive(Debug, Clone, Default)]
pub struct DurationCache {
    entries: HashMap<String, String>,
}

impl DurationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached display value, or the sentinel while unresolved
    pub fn get(&self, resource_url: &str) -> &str {
        self.entries
            .get(resource_url)
            .map(String::as_str)
            .unwrap_or(UNRESOLVED_DURATION)
    }

    /// Stores a probe result, overwriting any earlier one
    pub fn insert(&mut self, resource_url: impl Into<String>, display: impl Into<String>) {
        self.entries.insert(resource_url.into(), display.into());
    }

    pub fn is_resolved(&self, resource_url: &str) -> bool {
        self.entries
            .get(resource_url)
            .is_some_and(|d| d != UNRESOLVED_DURATION)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
