//! Per-section validation
//!
//! Every section implements [`ConfigSection`]. Its `validate` runs a chain of
//! [`Checks`] and reports all bad fields at once, so a hand-edited file can be
//! fixed in one pass.

use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// A config section that can check and merge itself
pub trait ConfigSection: Default {
    /// All problems in this section, or `Ok` when it is usable
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Takes every value from `other`
    fn merge(&mut self, other: Self);

    /// Table name in `config.toml`
    fn section_name(&self) -> &'static str;
}

/// What is wrong with a field
#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    OutOfRange { got: String, min: String, max: String },
    Blank,
    NotHttpUrl { got: String, reason: String },
    MissingDirectory(PathBuf),
}

/// One bad field, addressed as `section.key`
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: &'static str,
    pub problem: Problem,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            Problem::OutOfRange { got, min, max } => {
                write!(f, "{} = {} is outside {}..={}", self.field, got, min, max)
            }
            Problem::Blank => write!(f, "{} must not be blank", self.field),
            Problem::NotHttpUrl { got, reason } => {
                write!(f, "{} = {:?} is not an http(s) URL ({})", self.field, got, reason)
            }
            Problem::MissingDirectory(path) => {
                write!(f, "{} = {} is not a directory", self.field, path.display())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Accumulates problems for one section
#[derive(Debug, Default)]
pub struct Checks {
    problems: Vec<ValidationError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(mut self, field: &'static str, problem: Problem) -> Self {
        self.problems.push(ValidationError { field, problem });
        self
    }

    /// `value` must lie in `min..=max`
    pub fn range<T>(self, field: &'static str, value: T, min: T, max: T) -> Self
    where
        T: PartialOrd + fmt::Display,
    {
        if value >= min && value <= max {
            return self;
        }
        self.flag(
            field,
            Problem::OutOfRange {
                got: value.to_string(),
                min: min.to_string(),
                max: max.to_string(),
            },
        )
    }

    pub fn filled(self, field: &'static str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.flag(field, Problem::Blank)
        } else {
            self
        }
    }

    /// `value` must parse as an absolute http or https URL with a host
    pub fn http_url(self, field: &'static str, value: &str) -> Self {
        let reason = match Url::parse(value) {
            Err(e) => e.to_string(),
            Ok(url) if !matches!(url.scheme(), "http" | "https") => {
                format!("scheme {} is not supported", url.scheme())
            }
            Ok(url) if url.host_str().map_or(true, str::is_empty) => "no host".to_string(),
            Ok(_) => return self,
        };
        self.flag(
            field,
            Problem::NotHttpUrl {
                got: value.to_string(),
                reason,
            },
        )
    }

    pub fn directory(self, field: &'static str, path: &Path) -> Self {
        if path.is_dir() {
            self
        } else {
            self.flag(field, Problem::MissingDirectory(path.to_path_buf()))
        }
    }

    pub fn finish(self) -> Result<(), Vec<ValidationError>> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(self.problems)
        }
    }
}
