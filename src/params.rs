//! Metric configuration parameters
//!
//! Every metric is configured by a small immutable parameter set applied at
//! initialization and replaceable at runtime. Invalid configurations are
//! rejected with a descriptive error, never silently coerced.

use crate::error::MetricsError;
use serde::{Deserialize, Serialize};

/// Hard upper bound on retained raw data points, regardless of configuration
pub const HARD_HISTORY_CAP: usize = 10_000;

/// Default sampling rate (Hz)
pub const DEFAULT_SAMPLING_RATE_HZ: f64 = 50.0;

/// Per-metric recording configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricParameters {
    /// Maximum algorithm invocations per simulated second
    pub sampling_rate_hz: f64,
    /// Start recording as soon as the metric is registered
    pub auto_start: bool,
    /// Retain raw data points alongside derived state
    pub log_raw_data: bool,
    /// Cap on retained raw data points (clamped to the hard cap)
    pub max_data_points: usize,
}

impl Default for MetricParameters {
    fn default() -> Self {
        Self {
            sampling_rate_hz: DEFAULT_SAMPLING_RATE_HZ,
            auto_start: false,
            log_raw_data: true,
            max_data_points: HARD_HISTORY_CAP,
        }
    }
}

impl MetricParameters {
    /// Validate this configuration, returning it with the history cap applied
    pub fn validated(self) -> Result<Self, MetricsError> {
        if !self.sampling_rate_hz.is_finite() || self.sampling_rate_hz <= 0.0 {
            return Err(MetricsError::InvalidParameters(format!(
                "sampling_rate_hz must be positive, got {}",
                self.sampling_rate_hz
            )));
        }
        if self.max_data_points == 0 {
            return Err(MetricsError::InvalidParameters(
                "max_data_points must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_data_points: self.max_data_points.min(HARD_HISTORY_CAP),
            ..self
        })
    }

    /// Minimum simulated-time spacing between algorithm invocations (seconds)
    pub fn sample_interval(&self) -> f64 {
        1.0 / self.sampling_rate_hz
    }
}
