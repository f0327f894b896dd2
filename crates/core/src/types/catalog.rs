//! Course catalog: ordered modules and their lessons
//!
//! The catalog is data driven. It is loaded from a TOML or JSON descriptor and
//! validated once; after that only completion flags change.

use crate::error::{AppError, Result};
use crate::types::{Lesson, LessonId, Module, ModuleId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Validated collection of modules
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    modules: Vec<Module>,
    #[serde(skip)]
    owners: HashMap<LessonId, usize>,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    modules: Vec<Module>,
}

impl Catalog {
    /// Builds a catalog, checking that module ids are unique, that every
    /// lesson id appears in exactly one module, and that every lesson has a
    /// resource URL.
    pub fn new(modules: Vec<Module>) -> Result<Self> {
        let mut module_ids: HashSet<ModuleId> = HashSet::new();
        let mut owners: HashMap<LessonId, usize> = HashMap::new();

        for (index, module) in modules.iter().enumerate() {
            if !module_ids.insert(module.id) {
                return Err(AppError::DuplicateModuleId {
                    id: module.id.value(),
                });
            }

            for lesson in &module.lessons {
                if lesson.resource_url.trim().is_empty() {
                    return Err(AppError::InvalidCatalog {
                        reason: format!("lesson {} has no resource URL", lesson.id),
                    });
                }
                if let Some(&first) = owners.get(&lesson.id) {
                    return Err(AppError::DuplicateLessonId {
                        id: lesson.id.value(),
                        first_module: modules[first].id.value(),
                        second_module: module.id.value(),
                    });
                }
                owners.insert(lesson.id, index);
            }
        }

        Ok(Self { modules, owners })
    }

    /// Parses a TOML descriptor (`[[modules]]` tables with nested `[[modules.lessons]]`)
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: CatalogFile =
            toml::from_str(contents).map_err(|e| AppError::catalog_parse("<toml>", e))?;
        Self::new(file.modules)
    }

    /// Parses a JSON descriptor (`{"modules": [...]}`)
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let file: CatalogFile =
            serde_json::from_str(contents).map_err(|e| AppError::catalog_parse("<json>", e))?;
        Self::new(file.modules)
    }

    /// Loads a catalog file, choosing the format by extension (`.json` or TOML otherwise)
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => AppError::from(e),
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let parsed = if is_json {
            serde_json::from_str::<CatalogFile>(&contents)
                .map_err(|e| AppError::catalog_parse(path, e))
        } else {
            toml::from_str::<CatalogFile>(&contents).map_err(|e| AppError::catalog_parse(path, e))
        }?;

        let catalog = Self::new(parsed.modules)?;
        log::info!(
            "Loaded catalog from {} ({} modules, {} lessons)",
            path.display(),
            catalog.modules.len(),
            catalog.lesson_count()
        );
        Ok(catalog)
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn lesson_count(&self) -> usize {
        self.owners.len()
    }

    /// All lessons in presentation order, paired with their module
    pub fn lessons(&self) -> impl Iterator<Item = (&Module, &Lesson)> {
        self.modules
            .iter()
            .flat_map(|m| m.lessons.iter().map(move |l| (m, l)))
    }

    pub fn lesson(&self, id: LessonId) -> Option<&Lesson> {
        self.module_of(id)
            .and_then(|m| m.lessons.iter().find(|l| l.id == id))
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Module that owns the given lesson
    pub fn module_of(&self, lesson_id: LessonId) -> Option<&Module> {
        self.owners.get(&lesson_id).map(|&i| &self.modules[i])
    }

    pub fn first_lesson(&self) -> Option<&Lesson> {
        self.lessons().next().map(|(_, l)| l)
    }

    /// Lesson following `after` in presentation order, crossing module boundaries
    pub fn next_lesson(&self, after: LessonId) -> Option<&Lesson> {
        let mut lessons = self.lessons().map(|(_, l)| l);
        lessons.by_ref().find(|l| l.id == after)?;
        lessons.next()
    }

    pub fn set_lesson_completed(&mut self, id: LessonId, completed: bool) -> Result<()> {
        let index = *self
            .owners
            .get(&id)
            .ok_or(AppError::LessonNotFound { id: id.value() })?;
        let lesson = self.modules[index]
            .lessons
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(AppError::LessonNotFound { id: id.value() })?;
        lesson.completed = completed;
        Ok(())
    }

    pub fn set_module_completed(&mut self, id: ModuleId, completed: bool) -> Result<()> {
        let module = self
            .modules
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(AppError::ModuleNotFound { id: id.value() })?;
        module.completed = completed;
        Ok(())
    }
}
