//! Reaction-time statistics
//!
//! Measures spawn-to-classification latency per avatar. Samples at or above
//! the outlier threshold are counted but excluded from averages and
//! percentiles (the operator plainly was not reacting to that avatar).

use crate::error::MetricsError;
use crate::events::AvatarEvent;
use crate::metric::{Metric, MetricAnalysisResult, Recorder};
use crate::params::MetricParameters;
use crate::sample::{EntityId, SampleHistory};
use crate::signal::stats::{percentile, summarize, MovingAverage, StreamingStats};
use crate::value::{MetricValue, Snapshot};
use std::collections::HashMap;

/// Reaction times at or above this are outliers (seconds)
pub const OUTLIER_THRESHOLD_SEC: f64 = 10.0;

/// Window length of the bounded moving average (samples)
pub const MOVING_AVERAGE_WINDOW: usize = 20;

/// Reaction-time metric collector
pub struct ReactionTimeMetric {
    name: String,
    recorder: Recorder,
    /// Spawn times of avatars not yet classified
    pending: HashMap<EntityId, f64>,
    valid_samples: Vec<f64>,
    stats: StreamingStats,
    moving_average: MovingAverage,
    outlier_count: u32,
    missed_count: u32,
    history: SampleHistory<f64>,
}

impl ReactionTimeMetric {
    pub fn new(params: MetricParameters) -> Result<Self, MetricsError> {
        let recorder = Recorder::new(params)?;
        let cap = recorder.params().max_data_points;
        Ok(Self {
            name: "reaction_time".to_string(),
            recorder,
            pending: HashMap::new(),
            valid_samples: Vec::new(),
            stats: StreamingStats::default(),
            moving_average: MovingAverage::new(MOVING_AVERAGE_WINDOW),
            outlier_count: 0,
            missed_count: 0,
            history: SampleHistory::new(cap),
        })
    }

    /// Record one latency sample directly; dropped while idle
    pub fn record_reaction(&mut self, seconds: f64, now: f64) {
        if !self.recorder.is_recording() {
            return;
        }
        if seconds >= OUTLIER_THRESHOLD_SEC {
            self.outlier_count += 1;
            return;
        }
        self.valid_samples.push(seconds);
        self.stats.add(seconds);
        self.moving_average.push(seconds);
        if self.recorder.params().log_raw_data {
            self.history
                .push(now, self.recorder.relative_time(now), seconds);
        }
    }

    pub fn valid_count(&self) -> usize {
        self.valid_samples.len()
    }

    pub fn outlier_count(&self) -> u32 {
        self.outlier_count
    }

    pub fn missed_count(&self) -> u32 {
        self.missed_count
    }

    /// Latest bounded moving average, when any valid samples exist
    pub fn moving_average(&self) -> Option<f64> {
        self.moving_average.mean()
    }
}

impl Metric for ReactionTimeMetric {
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
        self.pending.clear();
        self.valid_samples.clear();
        self.stats.reset();
        self.moving_average.clear();
        self.outlier_count = 0;
        self.missed_count = 0;
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
            MetricValue::Int(self.valid_samples.len() as i64),
        );
        snapshot.insert("mean_sec".to_string(), self.stats.mean.into());
        snapshot.insert("min_sec".to_string(), self.stats.min.into());
        snapshot.insert("max_sec".to_string(), self.stats.max.into());
        snapshot.insert(
            "moving_average_sec".to_string(),
            self.moving_average.mean().unwrap_or(0.0).into(),
        );
        snapshot.insert("outliers".to_string(), self.outlier_count.into());
        snapshot.insert("missed".to_string(), self.missed_count.into());
        snapshot.insert("pending".to_string(), self.pending.len().into());
        snapshot
    }

    fn analyze(&self, now: f64) -> MetricAnalysisResult {
        let stats = summarize(&self.valid_samples);

        let mut additional = Snapshot::new();
        additional.insert(
            "p50_sec".to_string(),
            percentile(&self.valid_samples, 50.0).into(),
        );
        additional.insert(
            "p90_sec".to_string(),
            percentile(&self.valid_samples, 90.0).into(),
        );
        additional.insert(
            "p95_sec".to_string(),
            percentile(&self.valid_samples, 95.0).into(),
        );
        additional.insert(
            "moving_average_sec".to_string(),
            self.moving_average.mean().unwrap_or(0.0).into(),
        );
        additional.insert("outlier_count".to_string(), self.outlier_count.into());
        additional.insert("missed_count".to_string(), self.missed_count.into());

        MetricAnalysisResult::from_summary(
            &self.name,
            stats,
            self.recorder.duration(now),
            additional,
        )
    }

    fn handle_event(&mut self, event: &AvatarEvent) {
        if !self.recorder.is_recording() {
            return;
        }
        match event {
            AvatarEvent::Spawned { id, timestamp, .. } => {
                self.pending.insert(*id, *timestamp);
            }
            AvatarEvent::Classified { id, timestamp, .. } => {
                if let Some(spawned) = self.pending.remove(id) {
                    self.record_reaction(timestamp - spawned, *timestamp);
                }
            }
            AvatarEvent::Despawned { id, missed, .. } => {
                self.pending.remove(id);
                if *missed {
                    self.missed_count += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PredictedClass;
    use crate::sample::{EntityCategory, Vec3};

    fn metric() -> ReactionTimeMetric {
        let mut m = ReactionTimeMetric::new(MetricParameters::default()).unwrap();
        m.start_recording(0.0);
        m
    }

    fn spawn(m: &mut ReactionTimeMetric, id: u64, t: f64) {
        m.handle_event(&AvatarEvent::Spawned {
            id: EntityId(id),
            category: EntityCategory::Hostile,
            timestamp: t,
            position: Vec3::ZERO,
        });
    }

    fn classify(m: &mut ReactionTimeMetric, id: u64, t: f64) {
        m.handle_event(&AvatarEvent::Classified {
            id: EntityId(id),
            category: EntityCategory::Hostile,
            predicted: PredictedClass::Hostile,
            timestamp: t,
            position: Vec3::ZERO,
        });
    }

    #[test]
    fn test_spawn_to_classification_latency() {
        let mut m = metric();
        spawn(&mut m, 1, 2.0);
        classify(&mut m, 1, 3.5);

        assert_eq!(m.valid_count(), 1);
        assert!((m.stats.mean - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_outliers_excluded_from_stats() {
        let mut m = metric();
        m.record_reaction(1.0, 1.0);
        m.record_reaction(12.0, 13.0);
        m.record_reaction(2.0, 15.0);

        assert_eq!(m.valid_count(), 2);
        assert_eq!(m.outlier_count(), 1);
        assert!((m.stats.mean - 1.5).abs() < 1e-9);
        assert_eq!(m.stats.max, 2.0);
    }

    #[test]
    fn test_unclassified_despawn_counts_missed() {
        let mut m = metric();
        spawn(&mut m, 1, 0.0);
        m.handle_event(&AvatarEvent::Despawned {
            id: EntityId(1),
            category: EntityCategory::Hostile,
            timestamp: 8.0,
            missed: true,
        });
        classify(&mut m, 1, 9.0); // no longer pending, ignored

        assert_eq!(m.missed_count(), 1);
        assert_eq!(m.valid_count(), 0);
    }

    #[test]
    fn test_moving_average_is_bounded() {
        let mut m = metric();
        for i in 0..50 {
            m.record_reaction(i as f64 * 0.1, i as f64);
        }
        // Window holds the last 20 samples: 3.0..4.9, mean 3.95
        assert!((m.moving_average().unwrap() - 3.95).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_report() {
        let mut m = metric();
        for i in 1..=10 {
            m.record_reaction(i as f64 * 0.1, i as f64);
        }
        let report = m.analyze(20.0);
        assert!((report.additional["p90_sec"].as_f64().unwrap() - 0.9).abs() < 1e-9);
        assert!((report.median - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_reset_round_trip() {
        let mut m = metric();
        spawn(&mut m, 1, 0.0);
        m.record_reaction(1.0, 1.0);
        m.reset();

        assert_eq!(m.valid_count(), 0);
        assert_eq!(m.outlier_count(), 0);
        assert_eq!(m.moving_average(), None);
        let snapshot = m.snapshot(2.0);
        assert_eq!(snapshot["pending"].as_i64(), Some(0));
    }

    #[test]
    fn test_idle_drops_samples() {
        let mut m = ReactionTimeMetric::new(MetricParameters::default()).unwrap();
        m.record_reaction(1.0, 1.0);
        spawn(&mut m, 1, 0.0);
        assert_eq!(m.valid_count(), 0);
        let snapshot = m.snapshot(2.0);
        assert_eq!(snapshot["pending"].as_i64(), Some(0));
    }
}
