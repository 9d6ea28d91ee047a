//! Metric registry and session orchestration
//!
//! The registry owns the active metric set, drives per-tick updates, collects
//! interval snapshots into session records, and forwards records to sink
//! collaborators. Sinks are fire-and-forget: a failing sink is logged and
//! dropped for that delivery, never allowed to stall ticking.

use crate::error::MetricsError;
use crate::events::AvatarEvent;
use crate::metric::{Metric, MetricAnalysisResult};
use crate::value::{MetricValue, Snapshot};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Default interval between snapshot collections (simulation seconds)
pub const DEFAULT_COLLECTION_INTERVAL_SEC: f64 = 1.0;

/// Composite record collected from every metric at the collection interval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Wall-clock time of collection
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    pub scenario: String,
    /// Simulation time since the session started (seconds)
    pub elapsed_sec: f64,
    /// Live snapshot per metric name
    pub metrics: BTreeMap<String, Snapshot>,
    pub active_stressors: Vec<String>,
}

/// End-of-session composite report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Wall-clock time the report was produced
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    pub scenario: String,
    /// Session duration in simulation seconds
    pub duration_sec: f64,
    /// Cross-metric totals
    pub totals: Snapshot,
    /// Final statistical report per metric name
    pub reports: BTreeMap<String, MetricAnalysisResult>,
}

/// Delivery target for session records and reports
///
/// Implementations own transport and encoding; the registry never retries.
pub trait MetricsSink {
    fn deliver_record(&mut self, record: &SessionRecord) -> Result<(), MetricsError>;

    fn deliver_report(&mut self, report: &SessionReport) -> Result<(), MetricsError>;
}

/// Owns the metric set and drives it through the session lifecycle
pub struct MetricRegistry {
    session_id: Uuid,
    scenario: String,
    metrics: Vec<Box<dyn Metric>>,
    sinks: Vec<Box<dyn MetricsSink>>,
    collection_interval_sec: f64,
    elapsed: f64,
    last_collection: f64,
    active_stressors: Vec<String>,
}

impl MetricRegistry {
    pub fn new(scenario: &str) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            scenario: scenario.to_string(),
            metrics: Vec::new(),
            sinks: Vec::new(),
            collection_interval_sec: DEFAULT_COLLECTION_INTERVAL_SEC,
            elapsed: 0.0,
            last_collection: 0.0,
            active_stressors: Vec::new(),
        }
    }

    pub fn with_collection_interval(scenario: &str, interval_sec: f64) -> Self {
        Self {
            collection_interval_sec: interval_sec.max(0.0),
            ..Self::new(scenario)
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn elapsed_sec(&self) -> f64 {
        self.elapsed
    }

    /// Register a metric; names must be unique
    pub fn register(&mut self, metric: Box<dyn Metric>) -> Result<(), MetricsError> {
        if self.metrics.iter().any(|m| m.name() == metric.name()) {
            return Err(MetricsError::DuplicateMetric(metric.name().to_string()));
        }
        debug!("registered metric '{}'", metric.name());
        let auto_start = metric.recorder().params().auto_start;
        let elapsed = self.elapsed;
        self.metrics.push(metric);
        if auto_start {
            if let Some(metric) = self.metrics.last_mut() {
                metric.start_recording(elapsed);
            }
        }
        Ok(())
    }

    pub fn add_sink(&mut self, sink: Box<dyn MetricsSink>) {
        self.sinks.push(sink);
    }

    pub fn metric(&self, name: &str) -> Option<&dyn Metric> {
        self.metrics
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    pub fn metric_mut(&mut self, name: &str) -> Option<&mut Box<dyn Metric>> {
        self.metrics.iter_mut().find(|m| m.name() == name)
    }

    pub fn metric_names(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.name().to_string()).collect()
    }

    /// Start recording on every metric
    pub fn start_session(&mut self) {
        debug!("session {} starting", self.session_id);
        let elapsed = self.elapsed;
        for metric in &mut self.metrics {
            metric.start_recording(elapsed);
        }
    }

    /// Stop recording on every metric
    pub fn stop_session(&mut self) {
        let elapsed = self.elapsed;
        for metric in &mut self.metrics {
            metric.stop_recording(elapsed);
        }
    }

    /// Reset every metric's derived state, keeping registrations
    pub fn reset_all(&mut self) {
        for metric in &mut self.metrics {
            metric.reset();
        }
        self.elapsed = 0.0;
        self.last_collection = 0.0;
    }

    /// Fan a domain event out to every metric
    pub fn publish_event(&mut self, event: &AvatarEvent) {
        for metric in &mut self.metrics {
            metric.handle_event(event);
        }
    }

    pub fn set_active_stressors(&mut self, stressors: Vec<String>) {
        self.active_stressors = stressors;
    }

    /// Advance one simulation tick; drives recording metrics and interval
    /// collection
    pub fn tick(&mut self, dt: f64) {
        self.elapsed += dt;
        let elapsed = self.elapsed;

        for metric in &mut self.metrics {
            if metric.recorder().is_recording() {
                metric.update(elapsed, dt);
            }
        }

        if self.collection_interval_sec > 0.0
            && elapsed - self.last_collection >= self.collection_interval_sec
        {
            self.last_collection = elapsed;
            let record = self.collect();
            self.deliver_record(&record);
        }
    }

    /// Snapshot every metric into a composite session record
    pub fn collect(&self) -> SessionRecord {
        let mut metrics = BTreeMap::new();
        for metric in &self.metrics {
            metrics.insert(metric.name().to_string(), metric.snapshot(self.elapsed));
        }
        SessionRecord {
            timestamp: Utc::now(),
            session_id: self.session_id,
            scenario: self.scenario.clone(),
            elapsed_sec: self.elapsed,
            metrics,
            active_stressors: self.active_stressors.clone(),
        }
    }

    fn deliver_record(&mut self, record: &SessionRecord) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.deliver_record(record) {
                warn!("dropping session record for failed sink: {e}");
            }
        }
    }

    /// End the session: stop metrics, build and deliver the composite report
    pub fn finish(&mut self) -> SessionReport {
        self.stop_session();

        let mut reports = BTreeMap::new();
        let mut total_samples: i64 = 0;
        for metric in &self.metrics {
            let report = metric.analyze(self.elapsed);
            total_samples += report.sample_count as i64;
            reports.insert(metric.name().to_string(), report);
        }

        let mut totals = Snapshot::new();
        totals.insert("metric_count".to_string(), self.metrics.len().into());
        totals.insert("total_samples".to_string(), MetricValue::Int(total_samples));

        let report = SessionReport {
            timestamp: Utc::now(),
            session_id: self.session_id,
            scenario: self.scenario.clone(),
            duration_sec: self.elapsed,
            totals,
            reports,
        };

        for sink in &mut self.sinks {
            if let Err(e) = sink.deliver_report(&report) {
                warn!("dropping session report for failed sink: {e}");
            }
        }

        report
    }
}
