//! Shared handler state

use crate::error::RelayResult;
use securgeek_config::RelayConfig;
use std::sync::Arc;

/// Upstream client plus the settings every request needs
#[derive(Clone)]
pub struct RelayState {
    client: reqwest::Client,
    config: Arc<RelayConfig>,
    api_key: Option<Arc<str>>,
}

impl RelayState {
    /// Builds the upstream client from the relay settings.
    ///
    /// A missing or blank `api_key` is accepted; chat calls then fail with
    /// the setup error instead of reaching upstream.
    pub fn new(config: RelayConfig, api_key: Option<String>) -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("SecurGeek-Relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(Arc::from);
        if api_key.is_none() {
            log::warn!(
                "{} is not set; chat requests will be rejected",
                config.api_key_env
            );
        }

        Ok(Self {
            client,
            config: Arc::new(config),
            api_key,
        })
    }

    /// Reads the API key from the environment variable named in the config
    pub fn from_env(config: RelayConfig) -> RelayResult<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::new(config, api_key)
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}
