//! Player configuration section

use crate::validation::{Checks, ConfigSection, ValidationError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lesson player preferences and behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Volume applied to newly opened handles (0-100)
    pub default_volume: u8,

    /// Seconds a selected lesson may take to become ready
    pub load_timeout_secs: u64,

    /// Per-lesson budget for duration probing
    pub probe_timeout_secs: u64,

    /// Step for skip forward/back in seconds
    pub skip_step_secs: u64,

    /// Volume change step for increment/decrement (0-100)
    pub volume_step: u8,

    /// Start playback as soon as a lesson is ready
    pub autoplay: bool,

    /// Base for root-relative resource URLs such as `/audios/1.1.mp3`
    pub asset_base_url: Option<String>,

    /// Where unauthenticated users are sent
    pub redirect_target: String,
}

impl PlayerConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn skip_step(&self) -> Duration {
        Duration::from_secs(self.skip_step_secs)
    }

    /// Default volume as a 0.0-1.0 gain
    pub fn volume_gain(&self) -> f32 {
        f32::from(self.default_volume.min(100)) / 100.0
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: 100,
            load_timeout_secs: 10,
            probe_timeout_secs: 15,
            skip_step_secs: 10,
            volume_step: 5,
            autoplay: false,
            asset_base_url: Some("http://localhost:5000".to_string()),
            redirect_target: "/?auth=signin&autoOpen=true".to_string(),
        }
    }
}

impl ConfigSection for PlayerConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let checks = Checks::new()
            .range("player.default_volume", self.default_volume, 0, 100)
            .range("player.load_timeout_secs", self.load_timeout_secs, 1, 300)
            .range("player.probe_timeout_secs", self.probe_timeout_secs, 1, 300)
            .range("player.skip_step_secs", self.skip_step_secs, 1, 600)
            .range("player.volume_step", self.volume_step, 1, 50)
            .filled("player.redirect_target", &self.redirect_target);

        match &self.asset_base_url {
            Some(base) => checks.http_url("player.asset_base_url", base),
            None => checks,
        }
        .finish()
    }

    fn merge(&mut self, other: Self) {
        self.default_volume = other.default_volume;
        self.load_timeout_secs = other.load_timeout_secs;
        self.probe_timeout_secs = other.probe_timeout_secs;
        self.skip_step_secs = other.skip_step_secs;
        self.volume_step = other.volume_step;
        self.autoplay = other.autoplay;
        self.asset_base_url = other.asset_base_url;
        self.redirect_target = other.redirect_target;
    }

    fn section_name(&self) -> &'static str {
        "player"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.load_timeout(), Duration::from_secs(10));
        assert!(!config.autoplay);
    }

    #[test]
    fn test_invalid_volume() {
        let config = PlayerConfig {
            default_volume: 101,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_load_timeout_rejected() {
        let config = PlayerConfig {
            load_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_asset_base_must_be_http() {
        let mut config = PlayerConfig {
            asset_base_url: Some("/audios".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.asset_base_url = Some("https://exa mple".to_string());
        let errors = config.validate().unwrap_err();
        assert_eq!(errors[0].field, "player.asset_base_url");

        config.asset_base_url = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_volume_gain() {
        let config = PlayerConfig {
            default_volume: 40,
            ..Default::default()
        };
        assert!((config.volume_gain() - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_merge() {
        let mut base = PlayerConfig::default();
        let other = PlayerConfig {
            default_volume: 80,
            autoplay: true,
            ..Default::default()
        };

        base.merge(other);
        assert_eq!(base.default_volume, 80);
        assert!(base.autoplay);
    }

    #[test]
    fn test_multiple_validation_errors() {
        let config = PlayerConfig {
            default_volume: 101,
            load_timeout_secs: 0,
            redirect_target: " ".to_string(),
            ..Default::default()
        };

        let result = config.validate();
        assert_eq!(result.unwrap_err().len(), 3);
    }
}
