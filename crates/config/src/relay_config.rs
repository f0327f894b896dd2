//! Chat relay configuration section

use crate::validation::{Checks, ConfigSection, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for the chat relay and the optional static asset service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Interface to bind
    pub bind_address: String,

    /// Listening port (the `PORT` environment variable overrides it)
    pub port: u16,

    /// Upstream chat-completion endpoint
    pub upstream_url: String,

    /// Model used when a request does not name one
    pub model: String,

    /// Name of the environment variable holding the upstream API key
    pub api_key_env: String,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Directory served under `/audios`; disabled when unset
    pub asset_dir: Option<PathBuf>,

    /// Upstream request timeout in seconds
    pub request_timeout_secs: u64,
}

impl RelayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `host:port` pair to bind
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            upstream_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 150,
            asset_dir: None,
            request_timeout_secs: 30,
        }
    }
}

impl ConfigSection for RelayConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let checks = Checks::new()
            .filled("relay.bind_address", &self.bind_address)
            .http_url("relay.upstream_url", &self.upstream_url)
            .filled("relay.model", &self.model)
            .filled("relay.api_key_env", &self.api_key_env)
            .range("relay.temperature", self.temperature, 0.0, 2.0)
            .range("relay.max_tokens", self.max_tokens, 1, 4096)
            .range("relay.request_timeout_secs", self.request_timeout_secs, 1, 600);

        match &self.asset_dir {
            Some(dir) => checks.directory("relay.asset_dir", dir),
            None => checks,
        }
        .finish()
    }

    fn merge(&mut self, other: Self) {
        self.bind_address = other.bind_address;
        self.port = other.port;
        self.upstream_url = other.upstream_url;
        self.model = other.model;
        self.api_key_env = other.api_key_env;
        self.temperature = other.temperature;
        self.max_tokens = other.max_tokens;
        self.asset_dir = other.asset_dir;
        self.request_timeout_secs = other.request_timeout_secs;
    }

    fn section_name(&self) -> &'static str {
        "relay"
    }
}
