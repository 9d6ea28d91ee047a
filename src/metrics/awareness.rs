//! Situational-awareness analytics
//!
//! Combines view-direction coverage, threat assessment with visibility
//! timeout, scanning-pattern detection, and peripheral-detection bookkeeping
//! into a weighted composite score. Terms with no data are excluded from both
//! the numerator and denominator of the composite.

use crate::error::MetricsError;
use crate::events::AvatarEvent;
use crate::metric::{Metric, MetricAnalysisResult, Recorder};
use crate::params::MetricParameters;
use crate::sample::{EntityCategory, EntityId, Pose, SampleHistory, Vec3};
use crate::signal::coverage::CoverageGrid;
use crate::signal::stats::summarize;
use crate::value::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Threats unseen for this long are dropped (seconds)
pub const THREAT_TIMEOUT_SEC: f64 = 5.0;

/// Distance at which threat scaling bottoms out (meters)
pub const THREAT_RANGE_M: f64 = 50.0;

/// A threat counts as tracked if gazed at within this window (seconds)
pub const TRACKED_MEMORY_SEC: f64 = 1.0;

/// Yaw change per tick that starts a scan (degrees)
pub const SCAN_START_DEG: f64 = 5.0;

/// Yaw change per tick below which a scan ends (degrees)
pub const SCAN_END_DEG: f64 = 1.0;

/// Minimum duration for a recorded scan (seconds)
pub const SCAN_MIN_DURATION_SEC: f64 = 0.5;

/// Spawn bearing beyond which detection counts as peripheral (degrees)
pub const PERIPHERAL_BEARING_DEG: f64 = 45.0;

/// Scan count saturates at this many scans in the composite
pub const SCAN_COUNT_CAP: u32 = 10;

// Composite weights
const W_DETECTION: f64 = 0.30;
const W_COVERAGE: f64 = 0.20;
const W_PRIORITIZATION: f64 = 0.25;
const W_PERIPHERAL: f64 = 0.15;
const W_SCAN: f64 = 0.10;

/// A scene entity visible this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibleEntity {
    pub id: EntityId,
    pub category: EntityCategory,
    pub position: Vec3,
}

/// Per-tick situational input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwarenessSample {
    pub head: Pose,
    #[serde(default)]
    pub visible: Vec<VisibleEntity>,
    /// Entity currently under the operator's gaze, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gaze_target: Option<EntityId>,
}

/// Live assessment of one potential threat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    pub id: EntityId,
    pub category: EntityCategory,
    /// Threat level (0-100), category base scaled by proximity
    pub threat_level: f64,
    pub distance_m: f64,
    pub direction: Vec3,
    pub tracked: bool,
    pub last_seen: f64,
}

/// A completed scanning sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub start_yaw_deg: f64,
    pub end_yaw_deg: f64,
    pub duration: f64,
    /// Known objects whose bearing fell inside the swept arc
    pub objects_in_arc: u32,
}

#[derive(Debug, Clone, Copy)]
struct SpawnInfo {
    peripheral: bool,
}

#[derive(Debug, Clone, Copy)]
struct ActiveScan {
    start_time: f64,
    start_yaw_deg: f64,
    swept_deg: f64,
}

fn wrap_deg(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a >= 180.0 {
        a -= 360.0;
    } else if a < -180.0 {
        a += 360.0;
    }
    a
}

fn category_base(category: EntityCategory) -> f64 {
    match category {
        EntityCategory::Hostile => 100.0,
        EntityCategory::Unknown => 50.0,
        EntityCategory::Friendly => 10.0,
    }
}

/// Situational-awareness metric collector
pub struct SituationalAwarenessMetric {
    name: String,
    recorder: Recorder,
    grid: CoverageGrid,
    pending: Option<AwarenessSample>,
    threats: HashMap<EntityId, ThreatAssessment>,
    gaze_memory: HashMap<EntityId, f64>,
    spawn_info: HashMap<EntityId, SpawnInfo>,
    detected: HashSet<EntityId>,
    spawned_count: u32,
    detected_count: u32,
    peripheral_opportunities: u32,
    peripheral_detections: u32,
    prev_yaw: Option<f64>,
    active_scan: Option<ActiveScan>,
    scans: Vec<ScanRecord>,
    score_history: SampleHistory<f64>,
}

impl SituationalAwarenessMetric {
    pub fn new(params: MetricParameters) -> Result<Self, MetricsError> {
        let recorder = Recorder::new(params)?;
        let cap = recorder.params().max_data_points;
        Ok(Self {
            name: "situational_awareness".to_string(),
            recorder,
            grid: CoverageGrid::new(),
            pending: None,
            threats: HashMap::new(),
            gaze_memory: HashMap::new(),
            spawn_info: HashMap::new(),
            detected: HashSet::new(),
            spawned_count: 0,
            detected_count: 0,
            peripheral_opportunities: 0,
            peripheral_detections: 0,
            prev_yaw: None,
            active_scan: None,
            scans: Vec::new(),
            score_history: SampleHistory::new(cap),
        })
    }

    /// Inject the latest situational sample; dropped while idle
    pub fn record_sample(&mut self, sample: AwarenessSample) {
        if !self.recorder.is_recording() {
            return;
        }
        self.pending = Some(sample);
    }

    pub fn coverage_pct(&self) -> f64 {
        self.grid.coverage_pct()
    }

    pub fn threats(&self) -> impl Iterator<Item = &ThreatAssessment> {
        self.threats.values()
    }

    pub fn threat_count(&self) -> usize {
        self.threats.len()
    }

    pub fn scan_count(&self) -> u32 {
        self.scans.len() as u32
    }

    pub fn scans(&self) -> &[ScanRecord] {
        &self.scans
    }

    /// Percentage of the top-3 threats currently tracked; None without threats
    pub fn threat_prioritization_pct(&self) -> Option<f64> {
        if self.threats.is_empty() {
            return None;
        }
        let mut by_level: Vec<&ThreatAssessment> = self.threats.values().collect();
        by_level.sort_by(|a, b| {
            b.threat_level
                .partial_cmp(&a.threat_level)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let top: Vec<&&ThreatAssessment> = by_level.iter().take(3).collect();
        let tracked = top.iter().filter(|t| t.tracked).count();
        Some(tracked as f64 / top.len() as f64 * 100.0)
    }

    /// Percentage of spawned entities detected; None without spawns
    pub fn detection_rate_pct(&self) -> Option<f64> {
        if self.spawned_count == 0 {
            return None;
        }
        Some(self.detected_count as f64 / self.spawned_count as f64 * 100.0)
    }

    /// Peripheral detection rate; None without peripheral spawn opportunities
    pub fn peripheral_rate_pct(&self) -> Option<f64> {
        if self.peripheral_opportunities == 0 {
            return None;
        }
        Some(self.peripheral_detections as f64 / self.peripheral_opportunities as f64 * 100.0)
    }

    /// Weighted composite awareness score (0-100)
    ///
    /// Terms without data contribute to neither the numerator nor the weight
    /// sum; with no data at all the score is 0.
    pub fn composite_score(&self) -> f64 {
        let has_samples = self.recorder.samples_taken() > 0;

        let mut numerator = 0.0;
        let mut weight_sum = 0.0;
        let mut add = |value: Option<f64>, weight: f64| {
            if let Some(v) = value {
                numerator += v.clamp(0.0, 100.0) * weight;
                weight_sum += weight;
            }
        };

        add(self.detection_rate_pct(), W_DETECTION);
        add(has_samples.then(|| self.coverage_pct()), W_COVERAGE);
        add(self.threat_prioritization_pct(), W_PRIORITIZATION);
        add(self.peripheral_rate_pct(), W_PERIPHERAL);
        add(
            has_samples.then(|| {
                self.scan_count().min(SCAN_COUNT_CAP) as f64 / SCAN_COUNT_CAP as f64 * 100.0
            }),
            W_SCAN,
        );

        if weight_sum <= 0.0 {
            return 0.0;
        }
        (numerator / weight_sum).clamp(0.0, 100.0)
    }

    fn assess_threats(&mut self, sample: &AwarenessSample, now: f64) {
        if let Some(gazed) = sample.gaze_target {
            self.gaze_memory.insert(gazed, now);
        }

        for entity in &sample.visible {
            // First sighting counts toward detection bookkeeping
            if self.detected.insert(entity.id) {
                self.detected_count += 1;
                if let Some(info) = self.spawn_info.get(&entity.id) {
                    if info.peripheral {
                        self.peripheral_detections += 1;
                    }
                }
            }

            let offset = entity.position - sample.head.position;
            let distance = offset.length();
            let proximity = 0.5 + 0.5 * (1.0 - distance / THREAT_RANGE_M).clamp(0.0, 1.0);
            let tracked = self
                .gaze_memory
                .get(&entity.id)
                .map(|t| now - t <= TRACKED_MEMORY_SEC)
                .unwrap_or(false);

            self.threats.insert(
                entity.id,
                ThreatAssessment {
                    id: entity.id,
                    category: entity.category,
                    threat_level: (category_base(entity.category) * proximity).clamp(0.0, 100.0),
                    distance_m: distance,
                    direction: offset.normalized(),
                    tracked,
                    last_seen: now,
                },
            );
        }

        // Refresh tracked flags and drop stale assessments
        for threat in self.threats.values_mut() {
            threat.tracked = self
                .gaze_memory
                .get(&threat.id)
                .map(|t| now - t <= TRACKED_MEMORY_SEC)
                .unwrap_or(false);
        }
        self.threats
            .retain(|_, t| now - t.last_seen <= THREAT_TIMEOUT_SEC);
    }

    fn detect_scanning(&mut self, yaw: f64, now: f64) {
        let prev_yaw = match self.prev_yaw {
            Some(prev) => prev,
            None => {
                self.prev_yaw = Some(yaw);
                return;
            }
        };
        let change = wrap_deg(yaw - prev_yaw);
        self.prev_yaw = Some(yaw);

        match self.active_scan {
            None => {
                if change.abs() > SCAN_START_DEG {
                    self.active_scan = Some(ActiveScan {
                        start_time: now,
                        start_yaw_deg: prev_yaw,
                        swept_deg: change,
                    });
                }
            }
            Some(scan) => {
                if change.abs() < SCAN_END_DEG {
                    self.active_scan = None;
                    let duration = now - scan.start_time;
                    if duration > SCAN_MIN_DURATION_SEC {
                        let objects_in_arc = self.objects_in_arc(&scan);
                        self.scans.push(ScanRecord {
                            start_yaw_deg: scan.start_yaw_deg,
                            end_yaw_deg: wrap_deg(scan.start_yaw_deg + scan.swept_deg),
                            duration,
                            objects_in_arc,
                        });
                    }
                } else {
                    self.active_scan = Some(ActiveScan {
                        swept_deg: scan.swept_deg + change,
                        ..scan
                    });
                }
            }
        }
    }

    fn objects_in_arc(&self, scan: &ActiveScan) -> u32 {
        let lo = scan.swept_deg.min(0.0);
        let hi = scan.swept_deg.max(0.0);
        self.threats
            .values()
            .filter(|t| {
                let bearing = wrap_deg(t.direction.yaw_deg() - scan.start_yaw_deg);
                bearing >= lo && bearing <= hi
            })
            .count() as u32
    }
}

impl Metric for SituationalAwarenessMetric {
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
        self.grid.reset();
        self.pending = None;
        self.threats.clear();
        self.gaze_memory.clear();
        self.spawn_info.clear();
        self.detected.clear();
        self.spawned_count = 0;
        self.detected_count = 0;
        self.peripheral_opportunities = 0;
        self.peripheral_detections = 0;
        self.prev_yaw = None;
        self.active_scan = None;
        self.scans.clear();
        self.score_history.clear();
    }

    fn update(&mut self, now: f64, dt: f64) {
        let sample = match self.pending.take() {
            Some(sample) => sample,
            None => return,
        };
        if !self.recorder.try_sample(now) {
            return;
        }

        let forward = sample.head.forward();
        self.grid.mark(forward, dt);
        self.assess_threats(&sample, now);
        self.detect_scanning(forward.yaw_deg(), now);

        let score = self.composite_score();
        self.score_history
            .push(now, self.recorder.relative_time(now), score);
    }

    fn update_parameters(&mut self, params: MetricParameters) -> Result<(), MetricsError> {
        let params = params.validated()?;
        self.score_history.set_cap(params.max_data_points);
        self.recorder.set_params(params);
        Ok(())
    }

    fn snapshot(&self, now: f64) -> Snapshot {
        let mut snapshot = self.recorder.base_snapshot(now);
        snapshot.insert("composite_score".to_string(), self.composite_score().into());
        snapshot.insert("coverage_pct".to_string(), self.coverage_pct().into());
        snapshot.insert("active_threats".to_string(), self.threats.len().into());
        snapshot.insert(
            "threat_prioritization_pct".to_string(),
            self.threat_prioritization_pct().unwrap_or(0.0).into(),
        );
        snapshot.insert(
            "detection_rate_pct".to_string(),
            self.detection_rate_pct().unwrap_or(0.0).into(),
        );
        snapshot.insert("scan_count".to_string(), self.scan_count().into());
        snapshot
    }

    fn analyze(&self, now: f64) -> MetricAnalysisResult {
        let scores: Vec<f64> = self.score_history.iter().map(|p| p.payload).collect();
        let stats = summarize(&scores);

        let mut additional = Snapshot::new();
        additional.insert("final_score".to_string(), self.composite_score().into());
        additional.insert("coverage_pct".to_string(), self.coverage_pct().into());
        additional.insert("covered_cells".to_string(), self.grid.covered_cells().into());
        additional.insert("scan_count".to_string(), self.scan_count().into());
        additional.insert("spawned".to_string(), self.spawned_count.into());
        additional.insert("detected".to_string(), self.detected_count.into());
        if let Some(rate) = self.detection_rate_pct() {
            additional.insert("detection_rate_pct".to_string(), rate.into());
        }
        if let Some(rate) = self.peripheral_rate_pct() {
            additional.insert("peripheral_rate_pct".to_string(), rate.into());
        }
        if let Some(pct) = self.threat_prioritization_pct() {
            additional.insert("threat_prioritization_pct".to_string(), pct.into());
        }
        additional.insert(
            "mean_scan_duration_sec".to_string(),
            summarize(&self.scans.iter().map(|s| s.duration).collect::<Vec<_>>())
                .mean
                .into(),
        );

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
            AvatarEvent::Spawned { id, position, .. } => {
                self.spawned_count += 1;
                // Bearing relative to the most recent view direction
                let peripheral = match &self.pending {
                    Some(sample) => {
                        let offset = *position - sample.head.position;
                        sample.head.forward().angle_between_deg(offset) > PERIPHERAL_BEARING_DEG
                    }
                    None => self.prev_yaw.is_some() && {
                        let yaw = position.yaw_deg();
                        wrap_deg(yaw - self.prev_yaw.unwrap_or(0.0)).abs() > PERIPHERAL_BEARING_DEG
                    },
                };
                if peripheral {
                    self.peripheral_opportunities += 1;
                }
                self.spawn_info.insert(*id, SpawnInfo { peripheral });
            }
            AvatarEvent::Despawned { id, .. } => {
                self.threats.remove(id);
                self.gaze_memory.remove(id);
            }
            AvatarEvent::Classified { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Quat;

    const DT: f64 = 1.0 / 60.0;

    fn params() -> MetricParameters {
        MetricParameters {
            sampling_rate_hz: 240.0,
            ..Default::default()
        }
    }

    fn head_at_yaw(yaw_deg: f64) -> Pose {
        Pose::new(Vec3::ZERO, Quat::from_axis_angle_deg(Vec3::UP, yaw_deg))
    }

    fn visible(id: u64, category: EntityCategory, position: Vec3) -> VisibleEntity {
        VisibleEntity {
            id: EntityId(id),
            category,
            position,
        }
    }

    fn drive_sample(m: &mut SituationalAwarenessMetric, sample: AwarenessSample, now: f64) {
        m.record_sample(sample);
        m.update(now, DT);
    }

    #[test]
    fn test_threat_level_scaling() {
        let mut m = SituationalAwarenessMetric::new(params()).unwrap();
        m.start_recording(0.0);

        // Hostile at point blank: base 100 * 1.0
        drive_sample(
            &mut m,
            AwarenessSample {
                head: head_at_yaw(0.0),
                visible: vec![visible(1, EntityCategory::Hostile, Vec3::new(0.0, 0.0, 1.0))],
                gaze_target: None,
            },
            0.0,
        );
        let threat = m.threats().next().unwrap();
        assert!(threat.threat_level > 98.0);

        // Friendly far away: base 10 * 0.5
        drive_sample(
            &mut m,
            AwarenessSample {
                head: head_at_yaw(0.0),
                visible: vec![visible(
                    2,
                    EntityCategory::Friendly,
                    Vec3::new(0.0, 0.0, 60.0),
                )],
                gaze_target: None,
            },
            DT,
        );
        let friendly = m
            .threats()
            .find(|t| t.id == EntityId(2))
            .unwrap();
        assert!((friendly.threat_level - 5.0).abs() < 0.2);
    }

    #[test]
    fn test_threat_visibility_timeout() {
        let mut m = SituationalAwarenessMetric::new(params()).unwrap();
        m.start_recording(0.0);

        drive_sample(
            &mut m,
            AwarenessSample {
                head: head_at_yaw(0.0),
                visible: vec![visible(1, EntityCategory::Hostile, Vec3::new(0.0, 0.0, 10.0))],
                gaze_target: None,
            },
            0.0,
        );
        assert_eq!(m.threat_count(), 1);

        // Entity goes unseen; assessments survive until the timeout
        drive_sample(
            &mut m,
            AwarenessSample {
                head: head_at_yaw(0.0),
                visible: vec![],
                gaze_target: None,
            },
            4.0,
        );
        assert_eq!(m.threat_count(), 1);

        drive_sample(
            &mut m,
            AwarenessSample {
                head: head_at_yaw(0.0),
                visible: vec![],
                gaze_target: None,
            },
            5.5,
        );
        assert_eq!(m.threat_count(), 0);
    }

    #[test]
    fn test_threat_prioritization() {
        let mut m = SituationalAwarenessMetric::new(params()).unwrap();
        m.start_recording(0.0);

        // Three hostiles, operator gazing at entity 1
        drive_sample(
            &mut m,
            AwarenessSample {
                head: head_at_yaw(0.0),
                visible: vec![
                    visible(1, EntityCategory::Hostile, Vec3::new(0.0, 0.0, 5.0)),
                    visible(2, EntityCategory::Hostile, Vec3::new(5.0, 0.0, 5.0)),
                    visible(3, EntityCategory::Hostile, Vec3::new(-5.0, 0.0, 5.0)),
                ],
                gaze_target: Some(EntityId(1)),
            },
            0.0,
        );

        let pct = m.threat_prioritization_pct().unwrap();
        assert!((pct - 100.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_threats_excluded_from_composite() {
        let m = SituationalAwarenessMetric::new(params()).unwrap();
        // No samples, no spawns: nothing contributes
        assert_eq!(m.composite_score(), 0.0);
        assert!(m.threat_prioritization_pct().is_none());
        assert!(m.detection_rate_pct().is_none());
        assert!(m.peripheral_rate_pct().is_none());
    }

    #[test]
    fn test_scan_detection() {
        let mut m = SituationalAwarenessMetric::new(params()).unwrap();
        m.start_recording(0.0);

        let mut now = 0.0;
        // Settle the yaw reference
        drive_sample(
            &mut m,
            AwarenessSample {
                head: head_at_yaw(0.0),
                visible: vec![],
                gaze_target: None,
            },
            now,
        );
        now += DT;

        // Sweep 6 degrees per tick for 0.7 seconds
        let mut yaw = 0.0;
        for _ in 0..42 {
            yaw += 6.0;
            drive_sample(
                &mut m,
                AwarenessSample {
                    head: head_at_yaw(yaw),
                    visible: vec![],
                    gaze_target: None,
                },
                now,
            );
            now += DT;
        }
        // Come to rest
        for _ in 0..3 {
            drive_sample(
                &mut m,
                AwarenessSample {
                    head: head_at_yaw(yaw),
                    visible: vec![],
                    gaze_target: None,
                },
                now,
            );
            now += DT;
        }

        assert_eq!(m.scan_count(), 1);
        let scan = m.scans()[0];
        assert!(scan.duration > SCAN_MIN_DURATION_SEC);
    }

    #[test]
    fn test_detection_bookkeeping() {
        let mut m = SituationalAwarenessMetric::new(params()).unwrap();
        m.start_recording(0.0);

        // Prime a view sample so spawn bearing can be judged
        drive_sample(
            &mut m,
            AwarenessSample {
                head: head_at_yaw(0.0),
                visible: vec![],
                gaze_target: None,
            },
            0.0,
        );
        m.record_sample(AwarenessSample {
            head: head_at_yaw(0.0),
            visible: vec![],
            gaze_target: None,
        });

        // Central spawn and peripheral spawn
        m.handle_event(&AvatarEvent::Spawned {
            id: EntityId(1),
            category: EntityCategory::Hostile,
            timestamp: 0.1,
            position: Vec3::new(0.0, 0.0, 10.0),
        });
        m.handle_event(&AvatarEvent::Spawned {
            id: EntityId(2),
            category: EntityCategory::Hostile,
            timestamp: 0.1,
            position: Vec3::new(10.0, 0.0, -2.0),
        });

        // Only the central one becomes visible
        drive_sample(
            &mut m,
            AwarenessSample {
                head: head_at_yaw(0.0),
                visible: vec![visible(1, EntityCategory::Hostile, Vec3::new(0.0, 0.0, 10.0))],
                gaze_target: None,
            },
            0.2,
        );

        assert_eq!(m.detection_rate_pct(), Some(50.0));
        assert_eq!(m.peripheral_rate_pct(), Some(0.0));
    }

    #[test]
    fn test_composite_in_range() {
        let mut m = SituationalAwarenessMetric::new(params()).unwrap();
        m.start_recording(0.0);
        let mut now = 0.0;
        for i in 0..120 {
            drive_sample(
                &mut m,
                AwarenessSample {
                    head: head_at_yaw(i as f64),
                    visible: vec![visible(
                        1,
                        EntityCategory::Hostile,
                        Vec3::new(0.0, 0.0, 10.0),
                    )],
                    gaze_target: Some(EntityId(1)),
                },
                now,
            );
            now += DT;
        }
        let score = m.composite_score();
        assert!((0.0..=100.0).contains(&score));
        assert!(score > 0.0);
    }

    #[test]
    fn test_reset_round_trip() {
        let mut m = SituationalAwarenessMetric::new(params()).unwrap();
        m.start_recording(0.0);
        drive_sample(
            &mut m,
            AwarenessSample {
                head: head_at_yaw(0.0),
                visible: vec![visible(1, EntityCategory::Hostile, Vec3::new(0.0, 0.0, 5.0))],
                gaze_target: None,
            },
            0.0,
        );
        m.reset();

        assert_eq!(m.threat_count(), 0);
        assert_eq!(m.scan_count(), 0);
        assert_eq!(m.coverage_pct(), 0.0);
        assert_eq!(m.composite_score(), 0.0);
        assert!(m.recorder().is_recording());
    }
}
