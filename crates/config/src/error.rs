//! Errors raised while reading, checking or writing `config.toml`

use crate::validation::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A blank file is treated as damage, never as "use defaults"
    #[error("{path} is empty; remove it to start from defaults")]
    Empty { path: PathBuf },

    #[error("{path} is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot render settings as TOML: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("Cannot render settings as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Refusing to save invalid settings: {}", summarize(.0))]
    Invalid(Vec<ValidationError>),

    #[error("No per-user configuration directory on this platform")]
    NoConfigDir,
}

fn summarize(problems: &[ValidationError]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
