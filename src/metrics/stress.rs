//! Stress-level composite dynamics
//!
//! Blends weighted physiological, behavioral, performance, and environmental
//! components into a raw stress sum each tick, then runs it through the
//! bounded integrator. Component weights are configuration, not algorithm.

use crate::error::MetricsError;
use crate::metric::{Metric, MetricAnalysisResult, Recorder};
use crate::params::MetricParameters;
use crate::sample::SampleHistory;
use crate::signal::stats::summarize;
use crate::signal::stress::{StressDynamics, StressEvent, StressEventDetector, STRESS_BASELINE};
use crate::value::{MetricValue, Snapshot};
use serde::{Deserialize, Serialize};

/// HRV mapped to zero stress at or above this value (ms)
const HRV_RELAXED_MS: f64 = 80.0;

/// HRV mapped to full stress at or below this value (ms)
const HRV_STRESSED_MS: f64 = 20.0;

/// Reaction delay mapped to zero stress at or below this value (seconds)
const REACTION_RELAXED_SEC: f64 = 0.5;

/// Reaction delay mapped to full stress at or above this value (seconds)
const REACTION_STRESSED_SEC: f64 = 3.0;

/// Stress contribution per missed target
const MISSED_TARGET_STEP: f64 = 25.0;

/// Head angular speed mapped to full stress (degrees/second)
const HEAD_SPEED_STRESSED_DPS: f64 = 180.0;

/// Component weights for the raw stress sum; they sum to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressWeights {
    pub heart_rate_variability: f64,
    pub movement_jitter: f64,
    pub reaction_delay: f64,
    pub missed_targets: f64,
    pub rapid_head_movement: f64,
    pub trigger_pressure: f64,
    pub environmental: f64,
}

impl Default for StressWeights {
    fn default() -> Self {
        Self {
            heart_rate_variability: 0.2,
            movement_jitter: 0.15,
            reaction_delay: 0.15,
            missed_targets: 0.1,
            rapid_head_movement: 0.1,
            trigger_pressure: 0.1,
            environmental: 0.2,
        }
    }
}

/// Per-tick component inputs, injected by the owning session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressInputs {
    /// Heart-rate variability (RMSSD, ms); absent without a biosensor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hrv_rmssd_ms: Option<f64>,
    /// Hand jitter score (0-100), typically the controller tremor score
    pub movement_jitter: f64,
    /// Recent mean reaction delay (seconds); absent before the first call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction_delay_sec: Option<f64>,
    /// Targets missed so far
    pub missed_targets: u32,
    /// Current head angular speed (degrees/second)
    pub head_angular_speed_dps: f64,
    /// Current trigger pressure (0-1)
    pub trigger_pressure: f64,
    /// Environmental stressor intensity (0-100), from the stressor system
    pub environmental_level: f64,
    /// Names of currently active environmental stressors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_stressors: Vec<String>,
}

/// Per-component clamped sub-scores (each 0-100)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StressComponents {
    pub heart_rate_variability: f64,
    pub movement_jitter: f64,
    pub reaction_delay: f64,
    pub missed_targets: f64,
    pub rapid_head_movement: f64,
    pub trigger_pressure: f64,
    pub environmental: f64,
}

impl StressComponents {
    fn from_inputs(inputs: &StressInputs) -> Self {
        let hrv = inputs
            .hrv_rmssd_ms
            .map(|ms| {
                (HRV_RELAXED_MS - ms) / (HRV_RELAXED_MS - HRV_STRESSED_MS) * 100.0
            })
            .unwrap_or(0.0);
        let reaction = inputs
            .reaction_delay_sec
            .map(|sec| {
                (sec - REACTION_RELAXED_SEC) / (REACTION_STRESSED_SEC - REACTION_RELAXED_SEC)
                    * 100.0
            })
            .unwrap_or(0.0);

        Self {
            heart_rate_variability: hrv.clamp(0.0, 100.0),
            movement_jitter: inputs.movement_jitter.clamp(0.0, 100.0),
            reaction_delay: reaction.clamp(0.0, 100.0),
            missed_targets: (inputs.missed_targets as f64 * MISSED_TARGET_STEP).clamp(0.0, 100.0),
            rapid_head_movement: (inputs.head_angular_speed_dps / HEAD_SPEED_STRESSED_DPS * 100.0)
                .clamp(0.0, 100.0),
            trigger_pressure: (inputs.trigger_pressure * 100.0).clamp(0.0, 100.0),
            environmental: inputs.environmental_level.clamp(0.0, 100.0),
        }
    }

    fn weighted_sum(&self, weights: &StressWeights) -> f64 {
        self.heart_rate_variability * weights.heart_rate_variability
            + self.movement_jitter * weights.movement_jitter
            + self.reaction_delay * weights.reaction_delay
            + self.missed_targets * weights.missed_targets
            + self.rapid_head_movement * weights.rapid_head_movement
            + self.trigger_pressure * weights.trigger_pressure
            + self.environmental * weights.environmental
    }
}

/// Stress-level metric collector
pub struct StressLevelMetric {
    name: String,
    recorder: Recorder,
    weights: StressWeights,
    inputs: StressInputs,
    components: StressComponents,
    dynamics: StressDynamics,
    detector: StressEventDetector,
    rapid_increases: u32,
    sustained_highs: u32,
    recoveries: u32,
    level_history: SampleHistory<f64>,
}

impl StressLevelMetric {
    pub fn new(params: MetricParameters) -> Result<Self, MetricsError> {
        Self::with_weights(params, StressWeights::default())
    }

    pub fn with_weights(
        params: MetricParameters,
        weights: StressWeights,
    ) -> Result<Self, MetricsError> {
        let recorder = Recorder::new(params)?;
        let cap = recorder.params().max_data_points;
        Ok(Self {
            name: "stress_level".to_string(),
            recorder,
            weights,
            inputs: StressInputs::default(),
            components: StressComponents::default(),
            dynamics: StressDynamics::default(),
            detector: StressEventDetector::new(),
            rapid_increases: 0,
            sustained_highs: 0,
            recoveries: 0,
            level_history: SampleHistory::new(cap),
        })
    }

    /// Replace the component inputs used on subsequent ticks; dropped while idle
    pub fn record_inputs(&mut self, inputs: StressInputs) {
        if !self.recorder.is_recording() {
            return;
        }
        self.inputs = inputs;
    }

    pub fn level(&self) -> f64 {
        self.dynamics.current()
    }

    pub fn peak(&self) -> f64 {
        self.dynamics.peak()
    }

    pub fn accumulation(&self) -> f64 {
        self.dynamics.accumulation()
    }

    pub fn components(&self) -> &StressComponents {
        &self.components
    }

    pub fn active_stressors(&self) -> &[String] {
        &self.inputs.active_stressors
    }

    pub fn event_counts(&self) -> (u32, u32, u32) {
        (self.rapid_increases, self.sustained_highs, self.recoveries)
    }
}

impl Metric for StressLevelMetric {
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
        self.inputs = StressInputs::default();
        self.components = StressComponents::default();
        self.dynamics.reset();
        self.detector.reset();
        self.rapid_increases = 0;
        self.sustained_highs = 0;
        self.recoveries = 0;
        self.level_history.clear();
    }

    fn update(&mut self, now: f64, dt: f64) {
        if !self.recorder.try_sample(now) {
            return;
        }

        self.components = StressComponents::from_inputs(&self.inputs);
        let raw = STRESS_BASELINE + self.components.weighted_sum(&self.weights);
        let level = self.dynamics.step(raw, dt);

        for event in self.detector.push(level) {
            match event {
                StressEvent::RapidIncrease { .. } => self.rapid_increases += 1,
                StressEvent::SustainedHigh { .. } => self.sustained_highs += 1,
                StressEvent::Recovery { .. } => self.recoveries += 1,
            }
        }

        self.level_history
            .push(now, self.recorder.relative_time(now), level);
    }

    fn update_parameters(&mut self, params: MetricParameters) -> Result<(), MetricsError> {
        let params = params.validated()?;
        self.level_history.set_cap(params.max_data_points);
        self.recorder.set_params(params);
        Ok(())
    }

    fn snapshot(&self, now: f64) -> Snapshot {
        let mut snapshot = self.recorder.base_snapshot(now);
        snapshot.insert("level".to_string(), self.level().into());
        snapshot.insert("peak".to_string(), self.peak().into());
        snapshot.insert("accumulation".to_string(), self.accumulation().into());

        let mut components = Snapshot::new();
        components.insert("hrv".to_string(), self.components.heart_rate_variability.into());
        components.insert("movement_jitter".to_string(), self.components.movement_jitter.into());
        components.insert("reaction_delay".to_string(), self.components.reaction_delay.into());
        components.insert("missed_targets".to_string(), self.components.missed_targets.into());
        components.insert(
            "rapid_head_movement".to_string(),
            self.components.rapid_head_movement.into(),
        );
        components.insert(
            "trigger_pressure".to_string(),
            self.components.trigger_pressure.into(),
        );
        components.insert("environmental".to_string(), self.components.environmental.into());
        snapshot.insert("components".to_string(), components.into());

        snapshot.insert(
            "active_stressors".to_string(),
            MetricValue::List(
                self.inputs
                    .active_stressors
                    .iter()
                    .map(|s| MetricValue::Text(s.clone()))
                    .collect(),
            ),
        );
        snapshot
    }

    fn analyze(&self, now: f64) -> MetricAnalysisResult {
        let levels: Vec<f64> = self.level_history.iter().map(|p| p.payload).collect();
        let stats = summarize(&levels);

        let mut additional = Snapshot::new();
        additional.insert("peak".to_string(), self.peak().into());
        additional.insert("final_level".to_string(), self.level().into());
        additional.insert("final_accumulation".to_string(), self.accumulation().into());
        additional.insert("rapid_increases".to_string(), self.rapid_increases.into());
        additional.insert("sustained_high_periods".to_string(), self.sustained_highs.into());
        additional.insert("recoveries".to_string(), self.recoveries.into());

        MetricAnalysisResult::from_summary(
            &self.name,
            stats,
            self.recorder.duration(now),
            additional,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::stress::{ACCUMULATION_MAX, ACCUMULATION_MIN};

    const DT: f64 = 1.0 / 60.0;

    fn params() -> MetricParameters {
        MetricParameters {
            sampling_rate_hz: 240.0,
            ..Default::default()
        }
    }

    fn calm_inputs() -> StressInputs {
        StressInputs {
            hrv_rmssd_ms: Some(85.0),
            ..Default::default()
        }
    }

    fn stressed_inputs() -> StressInputs {
        StressInputs {
            hrv_rmssd_ms: Some(15.0),
            movement_jitter: 90.0,
            reaction_delay_sec: Some(4.0),
            missed_targets: 5,
            head_angular_speed_dps: 250.0,
            trigger_pressure: 1.0,
            environmental_level: 95.0,
            active_stressors: vec!["alarm".to_string(), "smoke".to_string()],
        }
    }

    fn drive(m: &mut StressLevelMetric, inputs: StressInputs, ticks: usize, start: f64) -> f64 {
        let mut now = start;
        m.record_inputs(inputs);
        for _ in 0..ticks {
            m.update(now, DT);
            now += DT;
        }
        now
    }

    #[test]
    fn test_calm_session_stays_near_baseline() {
        let mut m = StressLevelMetric::new(params()).unwrap();
        m.start_recording(0.0);
        drive(&mut m, calm_inputs(), 600, 0.0);

        // Accumulation decay pulls slightly below baseline; nothing drives it up
        assert!(m.level() < STRESS_BASELINE + 1.0);
        assert!(m.level() >= 0.0);
    }

    #[test]
    fn test_stressed_session_rises_and_peaks() {
        let mut m = StressLevelMetric::new(params()).unwrap();
        m.start_recording(0.0);
        let now = drive(&mut m, stressed_inputs(), 1200, 0.0);

        assert!(m.level() > 70.0);
        assert!(m.peak() >= m.level());

        // Recovery after the stressors clear
        drive(&mut m, calm_inputs(), 3600, now);
        assert!(m.level() < 40.0);
        assert!(m.peak() > 70.0);
    }

    #[test]
    fn test_bounds_hold_for_long_sessions() {
        let mut m = StressLevelMetric::new(params()).unwrap();
        m.start_recording(0.0);
        let mut now = 0.0;
        for i in 0..20_000 {
            let inputs = if (i / 100) % 2 == 0 {
                stressed_inputs()
            } else {
                calm_inputs()
            };
            m.record_inputs(inputs);
            m.update(now, DT);
            now += DT;

            assert!((0.0..=100.0).contains(&m.level()));
            assert!((ACCUMULATION_MIN..=ACCUMULATION_MAX).contains(&m.accumulation()));
        }
    }

    #[test]
    fn test_component_clamping() {
        let components = StressComponents::from_inputs(&StressInputs {
            hrv_rmssd_ms: Some(-50.0),
            movement_jitter: 500.0,
            reaction_delay_sec: Some(60.0),
            missed_targets: 100,
            head_angular_speed_dps: 10_000.0,
            trigger_pressure: 7.0,
            environmental_level: 400.0,
            active_stressors: vec![],
        });
        assert_eq!(components.heart_rate_variability, 100.0);
        assert_eq!(components.movement_jitter, 100.0);
        assert_eq!(components.reaction_delay, 100.0);
        assert_eq!(components.missed_targets, 100.0);
        assert_eq!(components.rapid_head_movement, 100.0);
        assert_eq!(components.trigger_pressure, 100.0);
        assert_eq!(components.environmental, 100.0);
    }

    #[test]
    fn test_missing_sensors_contribute_zero() {
        let components = StressComponents::from_inputs(&StressInputs::default());
        assert_eq!(components.heart_rate_variability, 0.0);
        assert_eq!(components.reaction_delay, 0.0);
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = StressWeights::default();
        let sum = w.heart_rate_variability
            + w.movement_jitter
            + w.reaction_delay
            + w.missed_targets
            + w.rapid_head_movement
            + w.trigger_pressure
            + w.environmental;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rapid_increase_event_fires() {
        let mut m = StressLevelMetric::new(params()).unwrap();
        m.start_recording(0.0);
        let now = drive(&mut m, calm_inputs(), 60, 0.0);
        drive(&mut m, stressed_inputs(), 300, now);

        let (rapid, _, _) = m.event_counts();
        assert!(rapid >= 1);
    }

    #[test]
    fn test_reset_round_trip() {
        let mut m = StressLevelMetric::new(params()).unwrap();
        m.start_recording(0.0);
        drive(&mut m, stressed_inputs(), 300, 0.0);
        m.reset();

        assert_eq!(m.level(), STRESS_BASELINE);
        assert_eq!(m.accumulation(), 0.0);
        assert_eq!(m.event_counts(), (0, 0, 0));
        assert!(m.active_stressors().is_empty());
        assert!(m.recorder().is_recording());
    }

    #[test]
    fn test_idle_drops_inputs() {
        let mut m = StressLevelMetric::new(params()).unwrap();
        m.record_inputs(stressed_inputs());
        m.update(0.0, DT);
        assert_eq!(m.level(), STRESS_BASELINE);
        assert_eq!(m.recorder().samples_taken(), 0);
    }
}
