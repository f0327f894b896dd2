//! Entry point for loading and saving settings

use crate::persistence::ConfigFile;
use crate::{Config, ConfigError, ConfigResult, LogLevel};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Owns the location of `config.toml` and the env override rules
pub struct ConfigManager {
    file: ConfigFile,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Uses the per-user config directory:
    /// - Linux: `~/.config/securgeek/`
    /// - macOS: `~/Library/Application Support/securgeek/`
    /// - Windows: `%APPDATA%\securgeek\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::default_config_dir()?;
        Self::with_directory(config_dir)
    }

    /// Creates a config manager with a custom config directory
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        Ok(Self {
            file: ConfigFile::new(config_dir.join("config.toml")),
            config_dir,
        })
    }

    fn default_config_dir() -> ConfigResult<PathBuf> {
        ProjectDirs::from("", "", "securgeek")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Returns the config directory path
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    /// Copy of the settings made before the last save
    pub fn backup_path(&self) -> PathBuf {
        self.file.backup_path()
    }

    /// Defaults when the file is missing; an error when it is blank or malformed
    pub fn load(&self) -> ConfigResult<Config> {
        self.file.read()
    }

    /// Never fails; a damaged file is logged and replaced by defaults in memory
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{}; using default settings", e);
                Config::default()
            }
        }
    }

    /// Rejects invalid settings with [`ConfigError::Invalid`]
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.file.write(config)
    }

    /// Load, edit, save
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use securgeek_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.player.autoplay = true;
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Writes the defaults unless a file is already there; true when written
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.file.path().exists() {
            log::debug!("Keeping existing {}", self.file.path().display());
            return Ok(false);
        }
        self.save(&Config::default())?;
        Ok(true)
    }

    /// Overwrites the file with defaults; the old one stays in the backup
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Human-readable problems in the file on disk
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the config and applies environment overrides
    ///
    /// Recognised variables:
    /// - `PORT`: relay listening port
    /// - `SECURGEEK_APP_LOG_LEVEL`, `SECURGEEK_APP_CATALOG_PATH`
    /// - `SECURGEEK_PLAYER_DEFAULT_VOLUME`, `SECURGEEK_PLAYER_ASSET_BASE_URL`,
    ///   `SECURGEEK_PLAYER_AUTOPLAY`
    /// - `SECURGEEK_RELAY_UPSTREAM_URL`, `SECURGEEK_RELAY_ASSET_DIR`
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }
}

/// Applies overrides found through `lookup`; unparsable values are ignored
/// with a warning.
pub(crate) fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        match port.trim().parse::<u16>() {
            Ok(p) => config.relay.port = p,
            Err(_) => log::warn!("Ignoring PORT={}: not a port number", port),
        }
    }

    if let Some(level) = lookup("SECURGEEK_APP_LOG_LEVEL") {
        match level.parse::<LogLevel>() {
            Ok(l) => config.app.log_level = l,
            Err(_) => log::warn!("Ignoring SECURGEEK_APP_LOG_LEVEL={}", level),
        }
    }

    if let Some(path) = lookup("SECURGEEK_APP_CATALOG_PATH") {
        config.app.catalog_path = PathBuf::from(path);
    }

    if let Some(volume) = lookup("SECURGEEK_PLAYER_DEFAULT_VOLUME") {
        match volume.parse::<u8>() {
            Ok(v) => config.player.default_volume = v,
            Err(_) => log::warn!("Ignoring SECURGEEK_PLAYER_DEFAULT_VOLUME={}", volume),
        }
    }

    if let Some(base) = lookup("SECURGEEK_PLAYER_ASSET_BASE_URL") {
        config.player.asset_base_url = if base.trim().is_empty() {
            None
        } else {
            Some(base)
        };
    }

    if let Some(autoplay) = lookup("SECURGEEK_PLAYER_AUTOPLAY") {
        config.player.autoplay = matches!(autoplay.to_lowercase().as_str(), "1" | "true" | "yes");
    }

    if let Some(url) = lookup("SECURGEEK_RELAY_UPSTREAM_URL") {
        config.relay.upstream_url = url;
    }

    if let Some(dir) = lookup("SECURGEEK_RELAY_ASSET_DIR") {
        config.relay.asset_dir = Some(PathBuf::from(dir));
    }
}
