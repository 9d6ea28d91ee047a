//! Classification statistics
//!
//! Tracks the operator's hostile/non-hostile calls against ground truth in a
//! confusion matrix. Precision, recall, and F1 are computed over the hostile
//! row/column with divide-by-zero guarded to 0, never NaN.

use crate::error::MetricsError;
use crate::events::{AvatarEvent, PredictedClass};
use crate::metric::{Metric, MetricAnalysisResult, Recorder};
use crate::params::MetricParameters;
use crate::sample::{EntityCategory, EntityId, SampleHistory};
use crate::signal::stats::summarize;
use crate::value::{MetricValue, Snapshot};
use serde::{Deserialize, Serialize};

/// One classification call made by the operator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSample {
    pub entity: EntityId,
    pub actual: EntityCategory,
    pub predicted: PredictedClass,
    /// Simulation time of the call (seconds)
    pub timestamp: f64,
}

/// Confusion matrix over actual {Hostile, Friendly, Unknown} x predicted
/// {Hostile, NonHostile}
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: [[u32; 2]; 3],
}

impl ConfusionMatrix {
    fn actual_row(actual: EntityCategory) -> usize {
        match actual {
            EntityCategory::Hostile => 0,
            EntityCategory::Friendly => 1,
            EntityCategory::Unknown => 2,
        }
    }

    fn predicted_col(predicted: PredictedClass) -> usize {
        match predicted {
            PredictedClass::Hostile => 0,
            PredictedClass::NonHostile => 1,
        }
    }

    pub fn record(&mut self, actual: EntityCategory, predicted: PredictedClass) {
        self.counts[Self::actual_row(actual)][Self::predicted_col(predicted)] += 1;
    }

    pub fn count(&self, actual: EntityCategory, predicted: PredictedClass) -> u32 {
        self.counts[Self::actual_row(actual)][Self::predicted_col(predicted)]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().flatten().sum()
    }

    /// Hostiles called hostile
    pub fn true_positives(&self) -> u32 {
        self.count(EntityCategory::Hostile, PredictedClass::Hostile)
    }

    /// Hostiles called non-hostile
    pub fn false_negatives(&self) -> u32 {
        self.count(EntityCategory::Hostile, PredictedClass::NonHostile)
    }

    /// Non-hostiles called hostile
    pub fn false_positives(&self) -> u32 {
        self.count(EntityCategory::Friendly, PredictedClass::Hostile)
            + self.count(EntityCategory::Unknown, PredictedClass::Hostile)
    }

    /// Non-hostiles called non-hostile
    pub fn true_negatives(&self) -> u32 {
        self.count(EntityCategory::Friendly, PredictedClass::NonHostile)
            + self.count(EntityCategory::Unknown, PredictedClass::NonHostile)
    }

    pub fn precision(&self) -> f64 {
        let denom = self.true_positives() + self.false_positives();
        if denom == 0 {
            return 0.0;
        }
        self.true_positives() as f64 / denom as f64
    }

    pub fn recall(&self) -> f64 {
        let denom = self.true_positives() + self.false_negatives();
        if denom == 0 {
            return 0.0;
        }
        self.true_positives() as f64 / denom as f64
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }

    /// Fraction of all calls that were correct (hostile->hostile or
    /// non-hostile->non-hostile)
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_positives() + self.true_negatives()) as f64 / total as f64
    }

    pub fn reset(&mut self) {
        self.counts = [[0; 2]; 3];
    }
}

/// Classification metric collector
pub struct ClassificationMetric {
    name: String,
    recorder: Recorder,
    matrix: ConfusionMatrix,
    correctness: Vec<f64>,
    history: SampleHistory<ClassificationSample>,
}

impl ClassificationMetric {
    pub fn new(params: MetricParameters) -> Result<Self, MetricsError> {
        let recorder = Recorder::new(params)?;
        let cap = recorder.params().max_data_points;
        Ok(Self {
            name: "classification".to_string(),
            recorder,
            matrix: ConfusionMatrix::default(),
            correctness: Vec::new(),
            history: SampleHistory::new(cap),
        })
    }

    /// Record one classification call; dropped while idle
    pub fn record_classification(&mut self, sample: ClassificationSample) {
        if !self.recorder.is_recording() {
            return;
        }
        self.matrix.record(sample.actual, sample.predicted);

        let correct = match (sample.actual, sample.predicted) {
            (EntityCategory::Hostile, PredictedClass::Hostile) => 1.0,
            (EntityCategory::Hostile, PredictedClass::NonHostile) => 0.0,
            (_, PredictedClass::NonHostile) => 1.0,
            (_, PredictedClass::Hostile) => 0.0,
        };
        self.correctness.push(correct);

        if self.recorder.params().log_raw_data {
            let relative = self.recorder.relative_time(sample.timestamp);
            self.history.push(sample.timestamp, relative, sample);
        }
    }

    pub fn matrix(&self) -> &ConfusionMatrix {
        &self.matrix
    }
}

impl Metric for ClassificationMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    fn reset(&mut self) {
        self.recorder.reset();
        self.matrix.reset();
        self.correctness.clear();
        self.history.clear();
    }

    fn update(&mut self, _now: f64, _dt: f64) {
        // Event-driven metric: nothing to do per tick
    }

    fn update_parameters(&mut self, params: MetricParameters) -> Result<(), MetricsError> {
        let params = params.validated()?;
        self.history.set_cap(params.max_data_points);
        self.recorder.set_params(params);
        Ok(())
    }

    fn snapshot(&self, now: f64) -> Snapshot {
        let mut snapshot = self.recorder.base_snapshot(now);
        snapshot.insert(
            "sample_count".to_string(),
            MetricValue::Int(self.matrix.total() as i64),
        );
        snapshot.insert("accuracy".to_string(), self.matrix.accuracy().into());
        snapshot.insert("precision".to_string(), self.matrix.precision().into());
        snapshot.insert("recall".to_string(), self.matrix.recall().into());
        snapshot.insert("f1".to_string(), self.matrix.f1().into());
        snapshot.insert(
            "true_positives".to_string(),
            self.matrix.true_positives().into(),
        );
        snapshot.insert(
            "false_positives".to_string(),
            self.matrix.false_positives().into(),
        );
        snapshot.insert(
            "false_negatives".to_string(),
            self.matrix.false_negatives().into(),
        );
        snapshot.insert(
            "true_negatives".to_string(),
            self.matrix.true_negatives().into(),
        );
        snapshot
    }

    fn analyze(&self, now: f64) -> MetricAnalysisResult {
        let stats = summarize(&self.correctness);

        let mut additional = Snapshot::new();
        additional.insert("accuracy".to_string(), self.matrix.accuracy().into());
        additional.insert("precision".to_string(), self.matrix.precision().into());
        additional.insert("recall".to_string(), self.matrix.recall().into());
        additional.insert("f1".to_string(), self.matrix.f1().into());
        additional.insert(
            "total_classifications".to_string(),
            self.matrix.total().into(),
        );
        for actual in [
            EntityCategory::Hostile,
            EntityCategory::Friendly,
            EntityCategory::Unknown,
        ] {
            let called_hostile = self.matrix.count(actual, PredictedClass::Hostile);
            let called_non_hostile = self.matrix.count(actual, PredictedClass::NonHostile);
            additional.insert(
                format!("{}_called_hostile", actual.as_str()),
                called_hostile.into(),
            );
            additional.insert(
                format!("{}_called_non_hostile", actual.as_str()),
                called_non_hostile.into(),
            );
        }

        MetricAnalysisResult::from_summary(
            &self.name,
            stats,
            self.recorder.duration(now),
            additional,
        )
    }

    fn handle_event(&mut self, event: &AvatarEvent) {
        if let AvatarEvent::Classified {
            id,
            category,
            predicted,
            timestamp,
            ..
        } = event
        {
            self.record_classification(ClassificationSample {
                entity: *id,
                actual: *category,
                predicted: *predicted,
                timestamp: *timestamp,
            });
        }
    }
}
