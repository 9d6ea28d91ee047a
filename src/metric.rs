//! Metric lifecycle and capability contract
//!
//! Every collector owns a [`Recorder`] for the shared Idle/Recording state
//! machine, sampling-rate throttling, and session timing, and implements the
//! [`Metric`] trait so the registry can drive all collectors uniformly.

use crate::error::MetricsError;
use crate::events::AvatarEvent;
use crate::params::MetricParameters;
use crate::signal::stats::SummaryStats;
use crate::value::{MetricValue, Snapshot};
use serde::{Deserialize, Serialize};

/// Recording state of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricState {
    Idle,
    Recording,
}

impl MetricState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricState::Idle => "idle",
            MetricState::Recording => "recording",
        }
    }
}

/// Shared lifecycle state: Idle/Recording machine, throttling, timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recorder {
    params: MetricParameters,
    state: MetricState,
    start_time: Option<f64>,
    end_time: Option<f64>,
    last_sample_time: Option<f64>,
    samples_taken: u64,
}

impl Recorder {
    /// Create with validated parameters
    pub fn new(params: MetricParameters) -> Result<Self, MetricsError> {
        Ok(Self {
            params: params.validated()?,
            state: MetricState::Idle,
            start_time: None,
            end_time: None,
            last_sample_time: None,
            samples_taken: 0,
        })
    }

    pub fn state(&self) -> MetricState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == MetricState::Recording
    }

    pub fn params(&self) -> &MetricParameters {
        &self.params
    }

    /// Replace parameters; the caller must pass a validated set
    pub fn set_params(&mut self, params: MetricParameters) {
        self.params = params;
    }

    /// Idle -> Recording; a no-op while already recording
    pub fn start(&mut self, now: f64) {
        if self.state == MetricState::Recording {
            return;
        }
        self.state = MetricState::Recording;
        self.start_time = Some(now);
        self.end_time = None;
        self.last_sample_time = None;
    }

    /// Recording -> Idle; a no-op while idle
    pub fn stop(&mut self, now: f64) {
        if self.state == MetricState::Idle {
            return;
        }
        self.state = MetricState::Idle;
        self.end_time = Some(now);
    }

    /// Clear timing and counters while staying in the current state
    pub fn reset(&mut self) {
        self.start_time = None;
        self.end_time = None;
        self.last_sample_time = None;
        self.samples_taken = 0;
    }

    /// Throttle gate: true when the algorithm body should run this tick
    ///
    /// Ticks arriving faster than the sampling interval are dropped silently,
    /// not queued.
    pub fn try_sample(&mut self, now: f64) -> bool {
        if self.state != MetricState::Recording {
            return false;
        }
        let due = match self.last_sample_time {
            None => true,
            Some(last) => now - last >= self.params.sample_interval(),
        };
        if due {
            self.last_sample_time = Some(now);
            self.samples_taken += 1;
        }
        due
    }

    pub fn samples_taken(&self) -> u64 {
        self.samples_taken
    }

    /// Seconds since recording started; 0 when never started
    pub fn relative_time(&self, now: f64) -> f64 {
        self.start_time.map(|s| now - s).unwrap_or(0.0)
    }

    /// Recorded duration: running time while recording, else the last span
    pub fn duration(&self, now: f64) -> f64 {
        match (self.start_time, self.end_time, self.state) {
            (Some(start), _, MetricState::Recording) => now - start,
            (Some(start), Some(end), MetricState::Idle) => end - start,
            _ => 0.0,
        }
    }

    /// Common snapshot fields shared by every metric
    pub fn base_snapshot(&self, now: f64) -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.insert("state".to_string(), self.state.as_str().into());
        snapshot.insert(
            "sample_count".to_string(),
            MetricValue::Int(self.samples_taken as i64),
        );
        snapshot.insert("duration_sec".to_string(), self.duration(now).into());
        snapshot
    }
}

/// End-of-session statistical report for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAnalysisResult {
    pub name: String,
    pub sample_count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Recorded duration (seconds)
    pub duration: f64,
    /// Metric-specific findings
    pub additional: Snapshot,
}

impl MetricAnalysisResult {
    /// Build from a batch summary over the metric's primary sample series
    pub fn from_summary(
        name: &str,
        stats: SummaryStats,
        duration: f64,
        additional: Snapshot,
    ) -> Self {
        Self {
            name: name.to_string(),
            sample_count: stats.count,
            mean: stats.mean,
            median: stats.median,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
            duration,
            additional,
        }
    }
}

/// Capability interface implemented by every metric collector
///
/// The registry drives collectors exclusively through this trait; collector
/// behavior lives behind it, not in a shared base type.
pub trait Metric {
    /// Unique name used for registration and report keys
    fn name(&self) -> &str;

    /// Concrete-type access for typed sample routing at the composition seam
    fn as_any(&self) -> &dyn std::any::Any;

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;

    fn recorder(&self) -> &Recorder;

    fn recorder_mut(&mut self) -> &mut Recorder;

    fn start_recording(&mut self, now: f64) {
        self.recorder_mut().start(now);
    }

    fn stop_recording(&mut self, now: f64) {
        self.recorder_mut().stop(now);
    }

    /// Clear all derived and raw state, keeping parameters and state-machine
    /// position
    fn reset(&mut self);

    /// Per-tick driver call; internally throttled by sampling rate
    fn update(&mut self, now: f64, dt: f64);

    /// Replace parameters at runtime; rejected when invalid
    fn update_parameters(&mut self, params: MetricParameters) -> Result<(), MetricsError>;

    /// Live snapshot; always available, zeroed when idle or empty
    fn snapshot(&self, now: f64) -> Snapshot;

    /// Final statistical report over data accumulated so far
    fn analyze(&self, now: f64) -> MetricAnalysisResult;

    /// Domain-event delivery; most metrics ignore most events
    fn handle_event(&mut self, _event: &AvatarEvent) {}

    fn state(&self) -> MetricState {
        self.recorder().state()
    }
}
