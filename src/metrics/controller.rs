//! Controller-movement analytics
//!
//! Per-hand kinematics from consecutive poses (velocity, cumulative travel,
//! running maxima), tremor and aim-stability scoring, trigger/grip edge
//! detection with interaction events, and gesture heuristics over the recent
//! sample window.

use crate::error::MetricsError;
use crate::metric::{Metric, MetricAnalysisResult, Recorder};
use crate::params::MetricParameters;
use crate::sample::{ControllerSample, Hand, RaycastEntity, SampleHistory, Vec3};
use crate::signal::stats::summarize;
use crate::signal::tremor::{AimStability, TremorEstimator};
use crate::value::{MetricValue, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Axis value at which a trigger or grip counts as pressed
pub const PRESS_THRESHOLD: f64 = 0.5;

/// Quiet period after a gesture fires (seconds)
pub const GESTURE_COOLDOWN_SEC: f64 = 0.5;

/// Recent-sample window used by the gesture heuristics
const GESTURE_WINDOW: usize = 30;

/// Samples required before the pointing heuristic can fire
const POINTING_MIN_SAMPLES: usize = 10;

/// Maximum positional spread for a steady pointing hand (meters)
const POINTING_MAX_SPREAD_M: f64 = 0.05;

/// Direction reversals required by the waving heuristic
const WAVE_MIN_REVERSALS: usize = 4;

/// Minimum lateral travel for a wave (meters)
const WAVE_MIN_TRAVEL_M: f64 = 0.5;

/// Which control produced an interaction event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionControl {
    Trigger,
    Grip,
}

/// Edge-detected press carrying the raycast target at press time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub hand: Hand,
    pub control: InteractionControl,
    pub timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<RaycastEntity>,
}

/// Gesture kinds recognized by the heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    Pointing,
    Waving,
    Grabbing,
}

impl Gesture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::Pointing => "pointing",
            Gesture::Waving => "waving",
            Gesture::Grabbing => "grabbing",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MotionSample {
    position: Vec3,
    trigger: f64,
    grip: f64,
}

/// Per-hand recording state
struct HandState {
    prev: Option<(f64, ControllerSample)>,
    cumulative_m: f64,
    max_linear_speed: f64,
    max_angular_speed_deg: f64,
    tremor: TremorEstimator,
    aim: AimStability,
    trigger_held: bool,
    grip_held: bool,
    recent: VecDeque<MotionSample>,
    gesture_ready_at: [f64; 3],
    gesture_counts: [u32; 3],
}

impl HandState {
    fn new() -> Self {
        Self {
            prev: None,
            cumulative_m: 0.0,
            max_linear_speed: 0.0,
            max_angular_speed_deg: 0.0,
            tremor: TremorEstimator::new(),
            aim: AimStability::new(),
            trigger_held: false,
            grip_held: false,
            recent: VecDeque::with_capacity(GESTURE_WINDOW),
            gesture_ready_at: [0.0; 3],
            gesture_counts: [0; 3],
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn gesture_index(gesture: Gesture) -> usize {
        match gesture {
            Gesture::Pointing => 0,
            Gesture::Waving => 1,
            Gesture::Grabbing => 2,
        }
    }

    fn try_fire(&mut self, gesture: Gesture, now: f64) -> bool {
        let index = Self::gesture_index(gesture);
        if now < self.gesture_ready_at[index] {
            return false;
        }
        self.gesture_ready_at[index] = now + GESTURE_COOLDOWN_SEC;
        self.gesture_counts[index] += 1;
        true
    }

    fn detect_pointing(&self) -> bool {
        if self.recent.len() < POINTING_MIN_SAMPLES {
            return false;
        }
        let tail: Vec<&MotionSample> = self.recent.iter().rev().take(POINTING_MIN_SAMPLES).collect();
        if !tail.iter().all(|s| s.trigger < 0.2 && s.grip > PRESS_THRESHOLD) {
            return false;
        }
        let n = tail.len() as f64;
        let centroid = tail.iter().fold(Vec3::ZERO, |acc, s| acc + s.position) * (1.0 / n);
        tail.iter()
            .all(|s| s.position.distance(centroid) < POINTING_MAX_SPREAD_M)
    }

    fn detect_waving(&self) -> bool {
        if self.recent.len() < GESTURE_WINDOW {
            return false;
        }
        let mut reversals = 0usize;
        let mut travel = 0.0;
        let mut prev_dx = 0.0;
        let mut iter = self.recent.iter();
        let mut prev = match iter.next() {
            Some(s) => s,
            None => return false,
        };
        for sample in iter {
            let dx = sample.position.x - prev.position.x;
            travel += dx.abs();
            if dx * prev_dx < 0.0 {
                reversals += 1;
            }
            if dx != 0.0 {
                prev_dx = dx;
            }
            prev = sample;
        }
        reversals >= WAVE_MIN_REVERSALS && travel >= WAVE_MIN_TRAVEL_M
    }

    fn detect_grabbing(&self, trigger: f64, grip: f64) -> bool {
        trigger > PRESS_THRESHOLD && grip > PRESS_THRESHOLD && !(self.trigger_held && self.grip_held)
    }
}

/// Controller-movement metric collector
pub struct ControllerMovementMetric {
    name: String,
    recorder: Recorder,
    left: HandState,
    right: HandState,
    pending: [Option<ControllerSample>; 2],
    speed_history: SampleHistory<f64>,
    interactions: Vec<InteractionEvent>,
    raw_history: SampleHistory<ControllerSample>,
}

impl ControllerMovementMetric {
    pub fn new(params: MetricParameters) -> Result<Self, MetricsError> {
        let recorder = Recorder::new(params)?;
        let cap = recorder.params().max_data_points;
        Ok(Self {
            name: "controller_movement".to_string(),
            recorder,
            left: HandState::new(),
            right: HandState::new(),
            pending: [None, None],
            speed_history: SampleHistory::new(cap),
            interactions: Vec::new(),
            raw_history: SampleHistory::new(cap),
        })
    }

    /// Inject the latest controller sample for its hand; dropped while idle
    pub fn record_sample(&mut self, sample: ControllerSample) {
        if !self.recorder.is_recording() {
            return;
        }
        let slot = match sample.hand {
            Hand::Left => 0,
            Hand::Right => 1,
        };
        self.pending[slot] = Some(sample);
    }

    fn hand_state(&self, hand: Hand) -> &HandState {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    pub fn tremor_score(&self, hand: Hand) -> f64 {
        self.hand_state(hand).tremor.score()
    }

    pub fn aim_stability(&self, hand: Hand) -> f64 {
        self.hand_state(hand).aim.score()
    }

    pub fn cumulative_movement_m(&self, hand: Hand) -> f64 {
        self.hand_state(hand).cumulative_m
    }

    pub fn interaction_count(&self) -> usize {
        self.interactions.len()
    }

    pub fn interactions(&self) -> &[InteractionEvent] {
        &self.interactions
    }

    pub fn gesture_count(&self, hand: Hand, gesture: Gesture) -> u32 {
        self.hand_state(hand).gesture_counts[HandState::gesture_index(gesture)]
    }

    fn process_hand(
        hand: &mut HandState,
        interactions: &mut Vec<InteractionEvent>,
        speed_history: &mut SampleHistory<f64>,
        sample: ControllerSample,
        now: f64,
        relative: f64,
    ) {
        if let Some((prev_t, prev_sample)) = hand.prev {
            let elapsed = now - prev_t;
            if elapsed > 0.0 {
                let traveled = sample.pose.position.distance(prev_sample.pose.position);
                let speed = traveled / elapsed;
                let angular =
                    prev_sample.pose.rotation.angle_to_deg(sample.pose.rotation) / elapsed;

                hand.cumulative_m += traveled;
                hand.max_linear_speed = hand.max_linear_speed.max(speed);
                hand.max_angular_speed_deg = hand.max_angular_speed_deg.max(angular);

                hand.tremor.push(now, speed);
                speed_history.push(now, relative, speed);
            }
        }
        hand.aim
            .push(now, sample.pose.position, sample.pose.forward());

        // Edge-detected presses carry the target under the ray at press time
        let trigger_pressed = sample.trigger > PRESS_THRESHOLD;
        if trigger_pressed && !hand.trigger_held {
            interactions.push(InteractionEvent {
                hand: sample.hand,
                control: InteractionControl::Trigger,
                timestamp: now,
                target: sample.pointed_at,
            });
        }
        let grip_pressed = sample.grip > PRESS_THRESHOLD;
        if grip_pressed && !hand.grip_held {
            interactions.push(InteractionEvent {
                hand: sample.hand,
                control: InteractionControl::Grip,
                timestamp: now,
                target: sample.pointed_at,
            });
        }

        if hand.detect_grabbing(sample.trigger, sample.grip) {
            hand.try_fire(Gesture::Grabbing, now);
        }

        hand.trigger_held = trigger_pressed;
        hand.grip_held = grip_pressed;

        hand.recent.push_back(MotionSample {
            position: sample.pose.position,
            trigger: sample.trigger,
            grip: sample.grip,
        });
        while hand.recent.len() > GESTURE_WINDOW {
            hand.recent.pop_front();
        }

        if hand.detect_pointing() {
            hand.try_fire(Gesture::Pointing, now);
        }
        if hand.detect_waving() {
            hand.try_fire(Gesture::Waving, now);
        }

        hand.prev = Some((now, sample));
    }

    fn hand_snapshot(hand: &HandState) -> Snapshot {
        let mut map = Snapshot::new();
        map.insert("cumulative_m".to_string(), hand.cumulative_m.into());
        map.insert("max_speed_mps".to_string(), hand.max_linear_speed.into());
        map.insert(
            "max_angular_speed_dps".to_string(),
            hand.max_angular_speed_deg.into(),
        );
        map.insert("tremor_score".to_string(), hand.tremor.score().into());
        map.insert("tremor_frequency_hz".to_string(), hand.tremor.frequency_hz().into());
        map.insert("aim_stability".to_string(), hand.aim.score().into());
        map.insert(
            "gestures".to_string(),
            MetricValue::Int(hand.gesture_counts.iter().map(|c| *c as i64).sum()),
        );
        map
    }
}

impl Metric for ControllerMovementMetric {
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
        self.left.reset();
        self.right.reset();
        self.pending = [None, None];
        self.speed_history.clear();
        self.interactions.clear();
        self.raw_history.clear();
    }

    fn update(&mut self, now: f64, _dt: f64) {
        if self.pending.iter().all(Option::is_none) {
            return;
        }
        if !self.recorder.try_sample(now) {
            return;
        }
        let relative = self.recorder.relative_time(now);

        for slot in 0..2 {
            if let Some(sample) = self.pending[slot] {
                let hand = match slot {
                    0 => &mut self.left,
                    _ => &mut self.right,
                };
                Self::process_hand(
                    hand,
                    &mut self.interactions,
                    &mut self.speed_history,
                    sample,
                    now,
                    relative,
                );
                if self.recorder.params().log_raw_data {
                    self.raw_history.push(now, relative, sample);
                }
            }
        }
    }

    fn update_parameters(&mut self, params: MetricParameters) -> Result<(), MetricsError> {
        let params = params.validated()?;
        self.speed_history.set_cap(params.max_data_points);
        self.raw_history.set_cap(params.max_data_points);
        self.recorder.set_params(params);
        Ok(())
    }

    fn snapshot(&self, now: f64) -> Snapshot {
        let mut snapshot = self.recorder.base_snapshot(now);
        snapshot.insert("left".to_string(), Self::hand_snapshot(&self.left).into());
        snapshot.insert("right".to_string(), Self::hand_snapshot(&self.right).into());
        snapshot.insert("interactions".to_string(), self.interactions.len().into());
        snapshot
    }

    fn analyze(&self, now: f64) -> MetricAnalysisResult {
        let speeds: Vec<f64> = self.speed_history.iter().map(|p| p.payload).collect();
        let stats = summarize(&speeds);

        let mut additional = Snapshot::new();
        for (label, hand) in [("left", &self.left), ("right", &self.right)] {
            additional.insert(format!("{label}_cumulative_m"), hand.cumulative_m.into());
            additional.insert(
                format!("{label}_max_speed_mps"),
                hand.max_linear_speed.into(),
            );
            additional.insert(format!("{label}_tremor_score"), hand.tremor.score().into());
            additional.insert(format!("{label}_aim_stability"), hand.aim.score().into());
            for gesture in [Gesture::Pointing, Gesture::Waving, Gesture::Grabbing] {
                additional.insert(
                    format!("{label}_{}_count", gesture.as_str()),
                    hand.gesture_counts[HandState::gesture_index(gesture)].into(),
                );
            }
        }
        additional.insert(
            "interaction_count".to_string(),
            self.interactions.len().into(),
        );

        MetricAnalysisResult::from_summary(
            &self.name,
            stats,
            self.recorder.duration(now),
            additional,
        )
    }
}
