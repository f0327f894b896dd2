//! `config.toml` on disk
//!
//! Writes go through a temp file next to the target and are renamed into
//! place, so a crash mid-save never leaves a half-written file. The file
//! being replaced is copied to `config.toml.backup` first.

use crate::{Config, ConfigError, ConfigResult, CONFIG_VERSION};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const HEADER: &str = "\
# SecurGeek lesson player and chat relay settings.
# Environment variables (PORT, SECURGEEK_*) override these values at startup.

";

pub(crate) struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("toml.backup")
    }

    /// Settings from disk, or defaults when there is no file yet.
    /// Out-of-range values are logged and kept so the user can fix them.
    pub fn read(&self) -> ConfigResult<Config> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", self.path.display());
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Err(ConfigError::Empty {
                path: self.path.clone(),
            });
        }

        let mut config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;

        if config.version != CONFIG_VERSION {
            log::warn!(
                "{} is format version {}, this build reads {}; unknown keys are ignored",
                self.path.display(),
                config.version,
                CONFIG_VERSION
            );
            config.version = CONFIG_VERSION;
        }

        if let Err(problems) = config.validate() {
            for problem in &problems {
                log::warn!("{}: {}", self.path.display(), problem);
            }
        }

        Ok(config)
    }

    /// Validates, backs up the current file, then replaces it
    pub fn write(&self, config: &Config) -> ConfigResult<()> {
        config.validate().map_err(ConfigError::Invalid)?;

        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_err)?;

        if self.path.is_file() {
            fs::copy(&self.path, self.backup_path()).map_err(write_err)?;
        }

        let body = format!("{}{}", HEADER, config.to_toml_string()?);
        let mut staged = NamedTempFile::new_in(dir).map_err(write_err)?;
        staged.write_all(body.as_bytes()).map_err(write_err)?;
        staged.flush().map_err(write_err)?;
        staged.persist(&self.path).map_err(|e| write_err(e.error))?;

        log::info!("Saved settings to {}", self.path.display());
        Ok(())
    }
}
