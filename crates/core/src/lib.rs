//! Shared model for the SecurGeek lesson player
//!
//! Holds the course catalog (modules and lessons), identifiers, the signed-in
//! identity record and the workspace-wide `AppError`.

pub mod error;
pub mod types;

pub use error::{AppError, ErrorSeverity, RecoveryAction, Result};
pub use types::{
    format_clock, Catalog, Lesson, LessonId, Module, ModuleId, UserIdentity, UNRESOLVED_DURATION,
};
