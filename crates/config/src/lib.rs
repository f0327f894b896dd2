//! SecurGeek configuration system
//!
//! Settings are grouped into sections (`app`, `player`, `relay`), each of
//! which implements [`ConfigSection`] so it can validate and merge itself.
//!
//! - Missing file: defaults are used
//! - Empty or unparsable file: error
//! - Invalid values: warning on load, hard error on save
//! - Saves are atomic (temp file + rename) and keep a `.toml.backup`
//!
//! # Example
//!
//! ```rust,no_run
//! use securgeek_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Relay port: {}", config.relay.port);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Config sections
pub mod app_config;
mod player_config;
mod relay_config;

pub use error::{ConfigError, ConfigResult};
pub use manager::ConfigManager;
pub use validation::{Checks, ConfigSection, Problem, ValidationError};

pub use app_config::{AppConfig, LogLevel};
pub use player_config::PlayerConfig;
pub use relay_config::RelayConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Application-level settings
    pub app: AppConfig,

    /// Lesson player behavior
    pub player: PlayerConfig,

    /// Chat relay and asset server
    pub relay: RelayConfig,
}

impl Config {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.player.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.relay.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.player.merge(other.player);
        self.relay.merge(other.relay);
    }

    /// Renders the config as TOML, the on-disk format
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Renders the config as pretty JSON for machine consumers
    pub fn to_json_string(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            player: PlayerConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_version_is_set() {
        let config = Config::default();
        assert_eq!(config.version, CONFIG_VERSION);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        let mut override_config = Config::default();
        override_config.player.default_volume = 75;
        override_config.relay.port = 8080;

        base.merge(override_config);
        assert_eq!(base.player.default_volume, 75);
        assert_eq!(base.relay.port, 8080);
    }

    #[test]
    fn test_errors_collected_across_sections() {
        let mut config = Config::default();
        config.player.default_volume = 120;
        config.relay.max_tokens = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[relay]\nport = 9000\n").unwrap();
        assert_eq!(config.relay.port, 9000);
        assert_eq!(config.player.load_timeout_secs, 10);
        assert!(!config.player.autoplay);
    }

    #[test]
    fn test_json_rendering() {
        let json = Config::default().to_json_string().unwrap();
        assert!(json.contains("\"api_key_env\": \"OPENAI_API_KEY\""));
    }
}
