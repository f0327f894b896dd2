//! Domain types for the lesson player
//!
//! - `lesson`: Lesson and Module records with their ids
//! - `catalog`: the ordered, validated collection of modules
//! - `identity`: the signed-in user as seen by the player
//! - `common`: clock formatting shared by the UI and the prober

mod catalog;
mod common;
mod identity;
mod lesson;

pub use catalog::Catalog;
pub use common::{format_clock, UNRESOLVED_DURATION};
pub use identity::UserIdentity;
pub use lesson::{Lesson, LessonId, Module, ModuleId};
