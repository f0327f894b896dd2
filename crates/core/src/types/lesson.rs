//! Lesson and module domain models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a lesson, unique across the whole catalog
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LessonId(u32);

impl LessonId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for LessonId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a module
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ModuleId(u32);

impl ModuleId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ModuleId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Smallest playable unit: one audio resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    /// Display-only duration as authored in the catalog (e.g. "15:00")
    #[serde(default, alias = "duration", alias = "declaredDuration")]
    pub declared_duration: String,
    /// Absolute URL or root-relative path of the audio asset
    #[serde(alias = "resourceUrl", alias = "audio_url")]
    pub resource_url: String,
    #[serde(default)]
    pub completed: bool,
}

impl Lesson {
    pub fn new(
        id: impl Into<LessonId>,
        title: impl Into<String>,
        declared_duration: impl Into<String>,
        resource_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            declared_duration: declared_duration.into(),
            resource_url: resource_url.into(),
            completed: false,
        }
    }
}

/// Ordered group of lessons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    #[serde(default, alias = "duration", alias = "declaredDuration")]
    pub declared_duration: String,
    #[serde(default)]
    pub completed: bool,
    /// Presentation order, not necessarily chronological
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Module {
    pub fn new(
        id: impl Into<ModuleId>,
        title: impl Into<String>,
        declared_duration: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            declared_duration: declared_duration.into(),
            completed: false,
            lessons: Vec::new(),
        }
    }

    /// Appends a lesson, builder style
    pub fn with_lesson(mut self, lesson: Lesson) -> Self {
        self.lessons.push(lesson);
        self
    }

    pub fn contains(&self, lesson_id: LessonId) -> bool {
        self.lessons.iter().any(|l| l.id == lesson_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_display_and_convert() {
        let id: LessonId = 7.into();
        assert_eq!(id.value(), 7);
        assert_eq!(id.to_string(), "7");
        assert_eq!(ModuleId::new(2).to_string(), "2");
    }

    #[test]
    fn test_module_builder_keeps_order() {
        let module = Module::new(1, "Intro", "45 mins")
            .with_lesson(Lesson::new(2, "Second", "12:30", "/audios/1.2.mp3"))
            .with_lesson(Lesson::new(1, "First", "15:00", "/audios/1.1.mp3"));

        let ids: Vec<u32> = module.lessons.iter().map(|l| l.id.value()).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(module.contains(LessonId::new(1)));
        assert!(!module.contains(LessonId::new(3)));
    }

    #[test]
    fn test_lesson_accepts_camel_case_keys() {
        let json = r#"{"id": 4, "title": "Phishing", "duration": "8:00",
                       "resourceUrl": "/audios/2.1.mp3", "completed": true}"#;
        let lesson: Lesson = serde_json::from_str(json).unwrap();
        assert_eq!(lesson.id, LessonId::new(4));
        assert_eq!(lesson.declared_duration, "8:00");
        assert_eq!(lesson.resource_url, "/audios/2.1.mp3");
        assert!(lesson.completed);
    }
}
