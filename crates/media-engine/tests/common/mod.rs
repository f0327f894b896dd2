//! Scripted collaborators shared by the engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use media_engine::{
    AudioBackend, AudioHandle, ControllerConfig, EngineError, EngineResult, EventSink,
    MediaEventKind, PlaybackController,
};
use securgeek_core::{Catalog, Lesson, Module};
use securgeek_network::ResourceValidator;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct BackendLog {
    pub sinks: Vec<(String, EventSink)>,
    pub live: usize,
    pub max_live: usize,
    pub plays: HashMap<String, usize>,
    pub released: Vec<String>,
}

/// Backend whose handles do nothing until the test emits events for them
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    pub log: Arc<Mutex<BackendLog>>,
}

impl ScriptedBackend {
    pub fn opened(&self) -> usize {
        self.log.lock().unwrap().sinks.len()
    }

    pub fn live(&self) -> usize {
        self.log.lock().unwrap().live
    }

    pub fn max_live(&self) -> usize {
        self.log.lock().unwrap().max_live
    }

    pub fn plays(&self, url: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .plays
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    /// Sink of the n-th opened handle (0-based)
    pub fn sink(&self, index: usize) -> EventSink {
        self.log.lock().unwrap().sinks[index].1.clone()
    }

    pub fn emit(&self, index: usize, kind: MediaEventKind) {
        self.sink(index).emit(kind);
    }
}

impl AudioBackend for ScriptedBackend {
    fn open(
        &self,
        resource_url: &str,
        _volume: f32,
        sink: EventSink,
    ) -> EngineResult<Box<dyn AudioHandle>> {
        let mut log = self.log.lock().unwrap();
        log.sinks.push((resource_url.to_string(), sink));
        log.live += 1;
        log.max_live = log.max_live.max(log.live);
        Ok(Box::new(ScriptedHandle {
            url: resource_url.to_string(),
            log: self.log.clone(),
            released: false,
        }))
    }
}

pub struct ScriptedHandle {
    url: String,
    log: Arc<Mutex<BackendLog>>,
    released: bool,
}

impl AudioHandle for ScriptedHandle {
    fn play(&mut self) -> EngineResult<()> {
        if self.released {
            return Err(EngineError::HandleReleased);
        }
        *self
            .log
            .lock()
            .unwrap()
            .plays
            .entry(self.url.clone())
            .or_insert(0) += 1;
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn seek(&mut self, _position_secs: f64) -> EngineResult<()> {
        Ok(())
    }

    fn set_volume(&mut self, _volume: f32) -> EngineResult<()> {
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            let mut log = self.log.lock().unwrap();
            log.live -= 1;
            log.released.push(self.url.clone());
        }
    }
}

/// Validator that rejects a configurable set of URLs and counts calls
#[derive(Clone, Default)]
pub struct ScriptedValidator {
    missing: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl ScriptedValidator {
    pub fn set_missing(&self, url: &str, missing: bool) {
        let mut set = self.missing.lock().unwrap();
        if missing {
            set.insert(url.to_string());
        } else {
            set.remove(url);
        }
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ResourceValidator for ScriptedValidator {
    async fn validate(&self, resource_url: &str) -> bool {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(resource_url.to_string())
            .or_insert(0) += 1;
        !self.missing.lock().unwrap().contains(resource_url)
    }
}

pub fn url(id: u32) -> String {
    format!("/audios/{}.mp3", id)
}

pub fn lesson(id: u32) -> Lesson {
    Lesson::new(id, format!("Lesson {}", id), "1:00", url(id))
}

/// Two modules: lessons 1-3 and 4-5
pub fn catalog() -> Catalog {
    Catalog::new(vec![
        Module::new(1, "Introduction to Cybersecurity", "45 mins")
            .with_lesson(lesson(1))
            .with_lesson(lesson(2))
            .with_lesson(lesson(3)),
        Module::new(2, "Social Engineering", "30 mins")
            .with_lesson(lesson(4))
            .with_lesson(lesson(5)),
    ])
    .unwrap()
}

pub fn controller(
    backend: &ScriptedBackend,
    validator: &ScriptedValidator,
) -> PlaybackController {
    PlaybackController::new(
        Arc::new(backend.clone()),
        Arc::new(validator.clone()),
        ControllerConfig::default(),
    )
}
