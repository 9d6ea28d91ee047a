//! Fixation and saccade detection
//!
//! Online classifier over the gaze-point stream. Consecutive gaze points
//! within a small angular threshold (viewed from the gaze origin) accumulate
//! into a fixation; a larger jump ends the fixation and registers a saccade.

use crate::sample::{RaycastEntity, Vec3};
use serde::{Deserialize, Serialize};

/// Angular threshold separating fixation drift from a saccade (degrees)
pub const FIXATION_ANGLE_DEG: f64 = 2.0;

/// Minimum accumulated duration for a valid fixation (seconds)
pub const MIN_FIXATION_SEC: f64 = 0.1;

/// Inter-saccade gaps longer than this are treated as non-saccadic (seconds)
pub const MAX_SACCADE_INTERVAL_SEC: f64 = 0.5;

/// A completed fixation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixationEvent {
    /// First entity observed during the fixation window, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<RaycastEntity>,
    /// Accumulated duration (seconds)
    pub duration: f64,
    /// Simulation time the window opened
    pub start_time: f64,
}

/// A rapid gaze shift between fixations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaccadeEvent {
    /// Angular jump size (degrees)
    pub amplitude_deg: f64,
    /// Time since the previous saccade (seconds)
    pub duration: f64,
}

/// Outcome of feeding one gaze observation to the detector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GazeTick {
    pub fixation: Option<FixationEvent>,
    pub saccade: Option<SaccadeEvent>,
    /// Whether this tick registered a fixation-target switch
    pub switched_target: bool,
}

/// Streaming fixation/saccade detector
#[derive(Debug, Clone, Default)]
pub struct FixationDetector {
    prev_point: Option<Vec3>,
    window_start: f64,
    window_time: f64,
    window_target: Option<RaycastEntity>,
    last_fixation_target: Option<RaycastEntity>,
    last_saccade_time: Option<f64>,
    fixation_count: u32,
    saccade_count: u32,
    switch_count: u32,
    total_fixation_time: f64,
    first_entity_fixation_time: Option<f64>,
}

impl FixationDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one gaze point; `origin` is the gaze origin for angular deltas
    pub fn observe(
        &mut self,
        origin: Vec3,
        point: Vec3,
        target: Option<RaycastEntity>,
        now: f64,
        dt: f64,
    ) -> GazeTick {
        let mut tick = GazeTick::default();

        let prev = match self.prev_point {
            Some(prev) => prev,
            None => {
                self.prev_point = Some(point);
                self.window_start = now;
                self.window_time = 0.0;
                self.window_target = target;
                return tick;
            }
        };

        let delta_deg = (prev - origin).angle_between_deg(point - origin);

        if delta_deg < FIXATION_ANGLE_DEG {
            self.window_time += dt;
            if self.window_target.is_none() {
                self.window_target = target;
            }
            if self.window_time >= MIN_FIXATION_SEC
                && self.first_entity_fixation_time.is_none()
                && self.window_target.is_some()
            {
                self.first_entity_fixation_time = Some(now);
            }
        } else {
            if self.window_time >= MIN_FIXATION_SEC {
                let fixation = FixationEvent {
                    target: self.window_target,
                    duration: self.window_time,
                    start_time: self.window_start,
                };
                self.fixation_count += 1;
                self.total_fixation_time += fixation.duration;

                if let (Some(current), Some(last)) = (self.window_target, self.last_fixation_target)
                {
                    if current.trackable && last.trackable && current.id != last.id {
                        self.switch_count += 1;
                        tick.switched_target = true;
                    }
                }
                self.last_fixation_target = self.window_target;
                tick.fixation = Some(fixation);
            }

            let interval = self
                .last_saccade_time
                .map(|t| now - t)
                .unwrap_or(MAX_SACCADE_INTERVAL_SEC);
            if interval < MAX_SACCADE_INTERVAL_SEC {
                let saccade = SaccadeEvent {
                    amplitude_deg: delta_deg,
                    duration: interval,
                };
                self.saccade_count += 1;
                tick.saccade = Some(saccade);
            }
            self.last_saccade_time = Some(now);

            // A new accumulation window opens at the landing point
            self.window_start = now;
            self.window_time = 0.0;
            self.window_target = target;
        }

        self.prev_point = Some(point);
        tick
    }

    /// Finalize a still-open fixation window, e.g. when recording stops
    pub fn flush(&mut self) -> Option<FixationEvent> {
        if self.window_time < MIN_FIXATION_SEC {
            return None;
        }
        let fixation = FixationEvent {
            target: self.window_target,
            duration: self.window_time,
            start_time: self.window_start,
        };
        self.fixation_count += 1;
        self.total_fixation_time += fixation.duration;
        self.last_fixation_target = self.window_target;
        self.window_time = 0.0;
        self.window_target = None;
        Some(fixation)
    }

    pub fn fixation_count(&self) -> u32 {
        self.fixation_count
    }

    pub fn saccade_count(&self) -> u32 {
        self.saccade_count
    }

    pub fn switch_count(&self) -> u32 {
        self.switch_count
    }

    pub fn total_fixation_time(&self) -> f64 {
        self.total_fixation_time
    }

    pub fn mean_fixation_duration(&self) -> f64 {
        if self.fixation_count == 0 {
            0.0
        } else {
            self.total_fixation_time / self.fixation_count as f64
        }
    }

    /// Simulation time at which the first entity fixation crossed the
    /// minimum-duration threshold, if it happened
    pub fn first_entity_fixation_time(&self) -> Option<f64> {
        self.first_entity_fixation_time
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
