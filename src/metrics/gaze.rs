//! Gaze-tracking analytics
//!
//! Consumes the gaze stream (eye tracking when present, head direction as a
//! silent fallback), classifies fixations and saccades, accumulates
//! per-category dwell time, and reports scan-path efficiency and attention
//! entropy at session end.

use crate::error::MetricsError;
use crate::metric::{Metric, MetricAnalysisResult, Recorder};
use crate::params::MetricParameters;
use crate::sample::{EntityCategory, GazeSample, SampleHistory, Vec3};
use crate::signal::fixation::FixationDetector;
use crate::signal::stats::{normalized_entropy, summarize};
use crate::value::Snapshot;

/// Projection distance for the gaze point when the ray hits nothing (meters)
pub const GAZE_FALLBACK_PROJECTION_M: f64 = 10.0;

/// Gaze-tracking metric collector
pub struct GazeTrackingMetric {
    name: String,
    recorder: Recorder,
    detector: FixationDetector,
    pending: Option<GazeSample>,
    fixation_durations: Vec<f64>,
    saccade_amplitudes: Vec<f64>,
    /// Dwell seconds indexed by [hostile, friendly, unknown]
    category_dwell: [f64; 3],
    path_length: f64,
    first_point: Option<Vec3>,
    last_point: Option<Vec3>,
    eye_ticks: u64,
    fallback_ticks: u64,
    history: SampleHistory<GazeSample>,
}

impl GazeTrackingMetric {
    pub fn new(params: MetricParameters) -> Result<Self, MetricsError> {
        let recorder = Recorder::new(params)?;
        let cap = recorder.params().max_data_points;
        Ok(Self {
            name: "gaze_tracking".to_string(),
            recorder,
            detector: FixationDetector::new(),
            pending: None,
            fixation_durations: Vec::new(),
            saccade_amplitudes: Vec::new(),
            category_dwell: [0.0; 3],
            path_length: 0.0,
            first_point: None,
            last_point: None,
            eye_ticks: 0,
            fallback_ticks: 0,
            history: SampleHistory::new(cap),
        })
    }

    /// Inject the latest gaze sample; dropped while idle
    pub fn record_sample(&mut self, sample: GazeSample) {
        if !self.recorder.is_recording() {
            return;
        }
        self.pending = Some(sample);
    }

    fn dwell_index(category: EntityCategory) -> usize {
        match category {
            EntityCategory::Hostile => 0,
            EntityCategory::Friendly => 1,
            EntityCategory::Unknown => 2,
        }
    }

    /// Scan-path efficiency: traveled distance over straight-line displacement
    pub fn scan_path_efficiency(&self) -> f64 {
        match (self.first_point, self.last_point) {
            (Some(first), Some(last)) => {
                let straight = first.distance(last);
                if straight <= 1e-6 {
                    0.0
                } else {
                    self.path_length / straight
                }
            }
            _ => 0.0,
        }
    }

    /// Attention-distribution entropy over per-category dwell shares (0-1)
    pub fn attention_entropy(&self) -> f64 {
        normalized_entropy(&self.category_dwell)
    }

    pub fn fixation_count(&self) -> u32 {
        self.detector.fixation_count()
    }

    pub fn saccade_count(&self) -> u32 {
        self.detector.saccade_count()
    }

    pub fn target_switches(&self) -> u32 {
        self.detector.switch_count()
    }

    /// Seconds from recording start to the first entity fixation, if any
    pub fn time_to_first_fixation(&self) -> Option<f64> {
        self.detector
            .first_entity_fixation_time()
            .map(|t| self.recorder.relative_time(t))
    }
}

impl Metric for GazeTrackingMetric {
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

    fn stop_recording(&mut self, now: f64) {
        if self.recorder.is_recording() {
            if let Some(fixation) = self.detector.flush() {
                self.fixation_durations.push(fixation.duration);
            }
        }
        self.recorder.stop(now);
    }

    fn reset(&mut self) {
        self.recorder.reset();
        self.detector.reset();
        self.pending = None;
        self.fixation_durations.clear();
        self.saccade_amplitudes.clear();
        self.category_dwell = [0.0; 3];
        self.path_length = 0.0;
        self.first_point = None;
        self.last_point = None;
        self.eye_ticks = 0;
        self.fallback_ticks = 0;
        self.history.clear();
    }

    fn update(&mut self, now: f64, dt: f64) {
        let sample = match self.pending {
            Some(sample) => sample,
            None => return,
        };
        if !self.recorder.try_sample(now) {
            return;
        }

        if sample.eye_direction.is_some() {
            self.eye_ticks += 1;
        } else {
            self.fallback_ticks += 1;
        }

        let origin = sample.origin();
        let direction = sample.direction();
        let (point, target) = match sample.hit {
            Some(hit) => (hit.point, hit.entity),
            None => (origin + direction * GAZE_FALLBACK_PROJECTION_M, None),
        };

        let tick = self.detector.observe(origin, point, target, now, dt);
        if let Some(fixation) = tick.fixation {
            self.fixation_durations.push(fixation.duration);
        }
        if let Some(saccade) = tick.saccade {
            self.saccade_amplitudes.push(saccade.amplitude_deg);
        }

        if let Some(entity) = target {
            self.category_dwell[Self::dwell_index(entity.category)] += dt;
        }

        if let Some(prev) = self.last_point {
            self.path_length += prev.distance(point);
        } else {
            self.first_point = Some(point);
        }
        self.last_point = Some(point);

        if self.recorder.params().log_raw_data {
            self.history
                .push(now, self.recorder.relative_time(now), sample);
        }
    }

    fn update_parameters(&mut self, params: MetricParameters) -> Result<(), MetricsError> {
        let params = params.validated()?;
        self.history.set_cap(params.max_data_points);
        self.recorder.set_params(params);
        Ok(())
    }

    fn snapshot(&self, now: f64) -> Snapshot {
        let mut snapshot = self.recorder.base_snapshot(now);
        snapshot.insert("fixations".to_string(), self.fixation_count().into());
        snapshot.insert("saccades".to_string(), self.saccade_count().into());
        snapshot.insert("target_switches".to_string(), self.target_switches().into());
        snapshot.insert(
            "mean_fixation_sec".to_string(),
            self.detector.mean_fixation_duration().into(),
        );
        snapshot.insert("scan_path_length_m".to_string(), self.path_length.into());

        let mut dwell = Snapshot::new();
        dwell.insert("hostile_sec".to_string(), self.category_dwell[0].into());
        dwell.insert("friendly_sec".to_string(), self.category_dwell[1].into());
        dwell.insert("unknown_sec".to_string(), self.category_dwell[2].into());
        snapshot.insert("dwell".to_string(), dwell.into());

        let tracked = self.eye_ticks + self.fallback_ticks;
        let eye_ratio = if tracked == 0 {
            0.0
        } else {
            self.eye_ticks as f64 / tracked as f64
        };
        snapshot.insert("eye_tracking_ratio".to_string(), eye_ratio.into());
        snapshot
    }

    fn analyze(&self, now: f64) -> MetricAnalysisResult {
        let stats = summarize(&self.fixation_durations);

        let mut additional = Snapshot::new();
        additional.insert("saccade_count".to_string(), self.saccade_count().into());
        additional.insert(
            "saccade_mean_amplitude_deg".to_string(),
            summarize(&self.saccade_amplitudes).mean.into(),
        );
        additional.insert(
            "target_switches".to_string(),
            self.target_switches().into(),
        );
        additional.insert(
            "total_fixation_time_sec".to_string(),
            self.detector.total_fixation_time().into(),
        );
        additional.insert(
            "scan_path_efficiency".to_string(),
            self.scan_path_efficiency().into(),
        );
        additional.insert(
            "attention_entropy".to_string(),
            self.attention_entropy().into(),
        );
        if let Some(t) = self.time_to_first_fixation() {
            additional.insert("time_to_first_fixation_sec".to_string(), t.into());
        }

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
    use crate::sample::{EntityId, Pose, Quat, RaycastEntity, RaycastHit};

    const DT: f64 = 1.0 / 60.0;

    fn params() -> MetricParameters {
        MetricParameters {
            sampling_rate_hz: 240.0,
            ..Default::default()
        }
    }

    fn entity(id: u64, category: EntityCategory) -> RaycastEntity {
        RaycastEntity {
            id: EntityId(id),
            category,
            trackable: true,
        }
    }

    fn sample_at(point: Vec3, target: Option<RaycastEntity>) -> GazeSample {
        GazeSample {
            head: Pose::new(Vec3::ZERO, Quat::IDENTITY),
            eye_direction: Some(point.normalized()),
            eye_openness: Some(1.0),
            hit: Some(RaycastHit {
                point,
                entity: target,
            }),
        }
    }

    #[test]
    fn test_steady_gaze_yields_single_fixation() {
        let mut m = GazeTrackingMetric::new(params()).unwrap();
        m.start_recording(0.0);

        let target = Some(entity(1, EntityCategory::Hostile));
        let mut now = 0.0;
        for _ in 0..61 {
            m.record_sample(sample_at(Vec3::new(0.0, 0.0, 10.0), target));
            m.update(now, DT);
            now += DT;
        }
        m.stop_recording(now);

        assert_eq!(m.fixation_count(), 1);
        let report = m.analyze(now);
        assert_eq!(report.sample_count, 1);
        assert!((report.mean - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_head_fallback_is_silent() {
        let mut m = GazeTrackingMetric::new(params()).unwrap();
        m.start_recording(0.0);

        let sample = GazeSample {
            head: Pose::new(Vec3::ZERO, Quat::IDENTITY),
            eye_direction: None,
            eye_openness: None,
            hit: None,
        };
        let mut now = 0.0;
        for _ in 0..10 {
            m.record_sample(sample);
            m.update(now, DT);
            now += DT;
        }

        let snapshot = m.snapshot(now);
        assert_eq!(snapshot["eye_tracking_ratio"].as_f64(), Some(0.0));
        assert_eq!(snapshot["sample_count"].as_i64(), Some(10));
    }

    #[test]
    fn test_dwell_and_entropy() {
        let mut m = GazeTrackingMetric::new(params()).unwrap();
        m.start_recording(0.0);

        let mut now = 0.0;
        // Equal dwell on hostile and friendly targets
        for _ in 0..60 {
            m.record_sample(sample_at(
                Vec3::new(0.0, 0.0, 10.0),
                Some(entity(1, EntityCategory::Hostile)),
            ));
            m.update(now, DT);
            now += DT;
        }
        for _ in 0..60 {
            m.record_sample(sample_at(
                Vec3::new(10.0, 0.0, 0.0),
                Some(entity(2, EntityCategory::Friendly)),
            ));
            m.update(now, DT);
            now += DT;
        }

        assert!((m.attention_entropy() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_scan_path_efficiency_straight_sweep() {
        let mut m = GazeTrackingMetric::new(params()).unwrap();
        m.start_recording(0.0);

        let mut now = 0.0;
        for i in 0..50 {
            let point = Vec3::new(i as f64 * 0.2, 0.0, 10.0);
            m.record_sample(sample_at(point, None));
            m.update(now, DT);
            now += DT;
        }

        // Monotonic sweep: traveled distance equals displacement
        assert!((m.scan_path_efficiency() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_idle_drops_samples() {
        let mut m = GazeTrackingMetric::new(params()).unwrap();
        m.record_sample(sample_at(Vec3::new(0.0, 0.0, 10.0), None));
        m.update(0.0, DT);
        assert_eq!(m.recorder().samples_taken(), 0);
    }

    #[test]
    fn test_reset_round_trip() {
        let mut m = GazeTrackingMetric::new(params()).unwrap();
        m.start_recording(0.0);
        let mut now = 0.0;
        for _ in 0..30 {
            m.record_sample(sample_at(
                Vec3::new(0.0, 0.0, 10.0),
                Some(entity(1, EntityCategory::Hostile)),
            ));
            m.update(now, DT);
            now += DT;
        }
        m.reset();

        assert_eq!(m.fixation_count(), 0);
        assert_eq!(m.scan_path_efficiency(), 0.0);
        assert_eq!(m.attention_entropy(), 0.0);
        assert!(m.time_to_first_fixation().is_none());
        assert!(m.recorder().is_recording());
    }
}
