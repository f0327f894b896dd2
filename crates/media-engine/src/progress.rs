//! Per-module totals of measured lesson durations

use securgeek_core::{format_clock, Catalog, LessonId, ModuleId};
use std::collections::HashMap;

/// Sums measured lesson lengths per module.
///
/// Each lesson contributes at most once; recording it again replaces the
/// previous measurement, so totals describe course length rather than
/// listening time.
#[derive(Debug, Clone, Default)]
pub struct ProgressAggregator {
    owners: HashMap<LessonId, ModuleId>,
    measured: HashMap<LessonId, f64>,
    totals: HashMap<ModuleId, f64>,
}

impl ProgressAggregator {
    pub fn new(catalog: &Catalog) -> Self {
        let owners = catalog
            .lessons()
            .map(|(module, lesson)| (lesson.id, module.id))
            .collect();
        Self {
            owners,
            measured: HashMap::new(),
            totals: HashMap::new(),
        }
    }

    /// Records a measurement; returns the owning module, or `None` when the
    /// lesson is unknown or the value unusable.
    pub fn record(&mut self, lesson_id: LessonId, measured_secs: f64) -> Option<ModuleId> {
        if !measured_secs.is_finite() || measured_secs < 0.0 {
            log::debug!("Ignoring measurement {} for lesson {}", measured_secs, lesson_id);
            return None;
        }
        let Some(&module_id) = self.owners.get(&lesson_id) else {
            log::warn!("Measurement for unknown lesson {}", lesson_id);
            return None;
        };

        let previous = self.measured.insert(lesson_id, measured_secs).unwrap_or(0.0);
        let total = self.totals.entry(module_id).or_insert(0.0);
        *total = (*total - previous + measured_secs).max(0.0);
        Some(module_id)
    }

    /// Summed seconds for a module; zero when nothing was measured
    pub fn module_total(&self, module_id: ModuleId) -> f64 {
        self.totals.get(&module_id).copied().unwrap_or(0.0)
    }

    /// `M:SS` total, or `None` before any lesson of the module was measured
    pub fn module_total_display(&self, module_id: ModuleId) -> Option<String> {
        self.totals.get(&module_id).map(|secs| format_clock(*secs))
    }

    pub fn measured(&self, lesson_id: LessonId) -> Option<f64> {
        self.measured.get(&lesson_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use securgeek_core::{Lesson, Module};

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Module::new(1, "Intro", "45 mins")
                .with_lesson(Lesson::new(1, "a", "", "/audios/1.1.mp3"))
                .with_lesson(Lesson::new(2, "b", "", "/audios/1.2.mp3")),
            Module::new(2, "Phishing", "30 mins")
                .with_lesson(Lesson::new(3, "c", "", "/audios/2.1.mp3")),
        ])
        .unwrap()
    }

    #[test]
    fn test_totals_per_module() {
        let mut aggregator = ProgressAggregator::new(&catalog());
        assert_eq!(aggregator.record(LessonId::new(1), 900.0), Some(ModuleId::new(1)));
        aggregator.record(LessonId::new(2), 750.0);
        aggregator.record(LessonId::new(3), 61.0);

        assert_eq!(aggregator.module_total(ModuleId::new(1)), 1650.0);
        assert_eq!(
            aggregator.module_total_display(ModuleId::new(1)).as_deref(),
            Some("27:30")
        );
        assert_eq!(aggregator.module_total(ModuleId::new(2)), 61.0);
    }

    #[test]
    fn test_repeat_measurement_replaces() {
        let mut aggregator = ProgressAggregator::new(&catalog());
        aggregator.record(LessonId::new(1), 900.0);
        aggregator.record(LessonId::new(1), 900.0);
        aggregator.record(LessonId::new(1), 902.0);
        assert_eq!(aggregator.module_total(ModuleId::new(1)), 902.0);
    }

    #[test]
    fn test_unknown_lesson_and_bad_values() {
        let mut aggregator = ProgressAggregator::new(&catalog());
        assert_eq!(aggregator.record(LessonId::new(99), 10.0), None);
        assert_eq!(aggregator.record(LessonId::new(1), f64::NAN), None);
        assert_eq!(aggregator.record(LessonId::new(1), -1.0), None);
        assert!(aggregator.module_total_display(ModuleId::new(1)).is_none());
    }
}
