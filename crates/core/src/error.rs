//! Error types and recovery strategies for the lesson player
//!
//! Errors are classified into three severity tiers:
//! - **Recoverable**: can be retried (network timeouts, etc.)
//! - **Degraded**: a feature is unavailable but the app continues (missing asset, etc.)
//! - **Fatal**: requires user intervention (malformed catalog, etc.)
//!
//! Each error carries a recovery action to guide the caller.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Recovery actions that can be taken when an error occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Offer the user a retry of the same operation
    OfferRetry,
    /// Retry with exponential backoff (e.g., server temporarily unavailable)
    RetryWithBackoff,
    /// Disable the failing feature and continue (e.g., duration probe failed)
    DisableFeature,
    /// Send the user to the sign-in entry point
    RedirectToSignIn,
    /// No automatic recovery - user intervention required
    UserIntervention,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OfferRetry => write!(f, "Offering retry"),
            Self::RetryWithBackoff => write!(f, "Retrying with backoff"),
            Self::DisableFeature => write!(f, "Disabling feature"),
            Self::RedirectToSignIn => write!(f, "Redirecting to sign in"),
            Self::UserIntervention => write!(f, "User intervention required"),
        }
    }
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Error can be recovered from by retrying
    Recoverable,
    /// Feature degraded but app can continue
    Degraded,
    /// Critical error requiring user action
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Main error type shared across the workspace
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Network Errors =====
    /// Network request failed
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Network timeout
    #[error("Network timeout after {seconds}s: {operation}")]
    NetworkTimeout { operation: String, seconds: u64 },

    /// Invalid URL provided
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    // ===== Catalog Errors =====
    /// Two modules share an id
    #[error("Duplicate module id {id} in catalog")]
    DuplicateModuleId { id: u32 },

    /// A lesson id appears more than once across the catalog
    #[error("Duplicate lesson id {id} in catalog (modules {first_module} and {second_module})")]
    DuplicateLessonId {
        id: u32,
        first_module: u32,
        second_module: u32,
    },

    /// Catalog content violates the schema
    #[error("Invalid catalog: {reason}")]
    InvalidCatalog { reason: String },

    /// Catalog file could not be parsed
    #[error("Catalog parse error in {path}: {reason}")]
    CatalogParseError { path: PathBuf, reason: String },

    /// Lesson id not present in the catalog
    #[error("Lesson not found: {id}")]
    LessonNotFound { id: u32 },

    /// Module id not present in the catalog
    #[error("Module not found: {id}")]
    ModuleNotFound { id: u32 },

    // ===== Session Errors =====
    /// No signed-in identity
    #[error("No signed-in user")]
    Unauthenticated,

    // ===== File System Errors =====
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// General I/O error
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: io::Error,
    },

    // ===== Generic Errors =====
    /// Invalid configuration value
    #[error("Invalid configuration: {setting} = '{value}' ({reason})")]
    InvalidConfiguration {
        setting: String,
        value: String,
        reason: String,
    },

    /// Invalid argument provided
    #[error("Invalid argument: {argument} - {reason}")]
    InvalidArgument { argument: String, reason: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl AppError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NetworkError { .. } | Self::NetworkTimeout { .. } => ErrorSeverity::Recoverable,

            Self::LessonNotFound { .. }
            | Self::ModuleNotFound { .. }
            | Self::InvalidUrl { .. }
            | Self::Unauthenticated => ErrorSeverity::Degraded,

            Self::DuplicateModuleId { .. }
            | Self::DuplicateLessonId { .. }
            | Self::InvalidCatalog { .. }
            | Self::CatalogParseError { .. } => ErrorSeverity::Fatal,

            _ => ErrorSeverity::Degraded,
        }
    }

    /// Returns the recommended recovery action for this error
    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::NetworkTimeout { .. } => RecoveryAction::OfferRetry,
            Self::NetworkError { .. } => RecoveryAction::RetryWithBackoff,
            Self::InvalidUrl { .. } => RecoveryAction::DisableFeature,
            Self::Unauthenticated => RecoveryAction::RedirectToSignIn,
            _ => RecoveryAction::UserIntervention,
        }
    }

    /// Returns a user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            Self::NetworkError { .. } | Self::NetworkTimeout { .. } => {
                "Cannot reach the lesson server. Please check your connection.".to_string()
            }
            Self::InvalidUrl { .. } => "The lesson link is not valid.".to_string(),
            Self::DuplicateModuleId { .. }
            | Self::DuplicateLessonId { .. }
            | Self::InvalidCatalog { .. }
            | Self::CatalogParseError { .. } => {
                "The course catalog is damaged and cannot be loaded.".to_string()
            }
            Self::LessonNotFound { .. } | Self::ModuleNotFound { .. } => {
                "The requested lesson was not found.".to_string()
            }
            Self::Unauthenticated => "Please sign in to access this course.".to_string(),
            Self::FileNotFound { .. } => "The file was not found.".to_string(),
            Self::IoError { .. } => "A file operation failed. Please try again.".to_string(),
            Self::InvalidConfiguration { setting, .. } => {
                format!("Invalid setting: {}. Please check your configuration.", setting)
            }
            Self::InvalidArgument { .. } => "Invalid input provided.".to_string(),
            Self::InternalError { .. } => {
                "An unexpected error occurred. Please try again.".to_string()
            }
        }
    }

    /// Returns true if this error should be logged at ERROR level
    pub fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }

    /// Returns true if the operation may succeed when repeated
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.recovery_action(),
            RecoveryAction::OfferRetry | RecoveryAction::RetryWithBackoff
        )
    }

    /// Helper to create a network error from any error type
    pub fn network<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Helper to create a catalog parse error
    pub fn catalog_parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CatalogParseError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::FileNotFound {
                path: PathBuf::from("unknown"),
            },
            _ => Self::IoError {
                message: err.to_string(),
                source: err,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_recovery_action_display() {
        assert_eq!(RecoveryAction::OfferRetry.to_string(), "Offering retry");
        assert_eq!(
            RecoveryAction::RedirectToSignIn.to_string(),
            "Redirecting to sign in"
        );
        assert_eq!(
            RecoveryAction::UserIntervention.to_string(),
            "User intervention required"
        );
    }

    #[test]
    fn test_error_severity_ordering() {
        assert!(ErrorSeverity::Recoverable < ErrorSeverity::Degraded);
        assert!(ErrorSeverity::Degraded < ErrorSeverity::Fatal);
    }

    #[test]
    fn test_network_timeout_is_retryable() {
        let err = AppError::NetworkTimeout {
            operation: "validate".to_string(),
            seconds: 10,
        };
        assert_eq!(err.severity(), ErrorSeverity::Recoverable);
        assert_eq!(err.recovery_action(), RecoveryAction::OfferRetry);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_catalog_errors_are_fatal() {
        let err = AppError::DuplicateLessonId {
            id: 3,
            first_module: 1,
            second_module: 2,
        };
        assert!(err.is_critical());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("modules 1 and 2"));
    }

    #[test]
    fn test_unauthenticated_redirects() {
        let err = AppError::Unauthenticated;
        assert_eq!(err.recovery_action(), RecoveryAction::RedirectToSignIn);
        assert!(err.user_message().contains("sign in"));
    }

    #[test]
    fn test_user_messages_hide_internals() {
        let err = AppError::catalog_parse("/etc/catalog.toml", "expected `=`");
        let msg = err.user_message();
        assert!(!msg.contains("expected"));
        assert!(msg.contains("catalog"));
    }

    #[test]
    fn test_network_helper_keeps_source() {
        let inner = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err = AppError::network("HEAD failed", inner);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_io_error() {
        let not_found: AppError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(not_found, AppError::FileNotFound { .. }));

        let other: AppError = io::Error::other("boom").into();
        assert!(matches!(other, AppError::IoError { .. }));
    }
}
