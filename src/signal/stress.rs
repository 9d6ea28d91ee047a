//! Stress dynamics
//!
//! The integrator turns a raw weighted stress sum into a smoothed level with
//! momentum: rising input charges a bounded accumulation term, falling input
//! drains it, and the output chases the target through a lerp filter. The
//! event detector compares short and long rolling averages to flag notable
//! transitions for analytics.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Resting stress floor
pub const STRESS_BASELINE: f64 = 20.0;

/// Bounds on the accumulation (momentum) term
pub const ACCUMULATION_MIN: f64 = -10.0;
pub const ACCUMULATION_MAX: f64 = 30.0;

/// Default accumulation growth rate (per second, applied to the raw excess)
pub const DEFAULT_GROWTH_RATE: f64 = 0.5;

/// Default accumulation decay rate (per second)
pub const DEFAULT_DECAY_RATE: f64 = 2.0;

/// Short/long rolling windows for event detection (ticks)
const SHORT_WINDOW: usize = 10;
const LONG_WINDOW: usize = 30;

/// Rapid-increase threshold between short and long averages
const RAPID_INCREASE_DELTA: f64 = 15.0;

/// Recovery threshold between long and short averages
const RECOVERY_DELTA: f64 = 20.0;

/// Stress level counted as "high"
const HIGH_STRESS_LEVEL: f64 = 80.0;

/// Consecutive high ticks before a sustained-high flag
const SUSTAINED_HIGH_TICKS: u32 = 30;

/// Bounded integrator over raw stress sums
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressDynamics {
    current: f64,
    peak: f64,
    accumulation: f64,
    growth_rate: f64,
    decay_rate: f64,
}

impl Default for StressDynamics {
    fn default() -> Self {
        Self::new(DEFAULT_GROWTH_RATE, DEFAULT_DECAY_RATE)
    }
}

impl StressDynamics {
    pub fn new(growth_rate: f64, decay_rate: f64) -> Self {
        Self {
            current: STRESS_BASELINE,
            peak: STRESS_BASELINE,
            accumulation: 0.0,
            growth_rate,
            decay_rate,
        }
    }

    /// Advance one tick with the raw weighted sum (baseline included)
    ///
    /// The smoothing blend uses the frame delta directly, which couples the
    /// filter's time constant to frame rate; see DESIGN.md.
    pub fn step(&mut self, raw: f64, dt: f64) -> f64 {
        if raw > self.current {
            self.accumulation += (raw - self.current) * self.growth_rate * dt;
        } else {
            self.accumulation -= self.decay_rate * dt;
        }
        self.accumulation = self.accumulation.clamp(ACCUMULATION_MIN, ACCUMULATION_MAX);

        let target = (raw + self.accumulation).clamp(0.0, 100.0);
        let blend = (2.0 * dt).clamp(0.0, 1.0);
        self.current += (target - self.current) * blend;
        self.current = self.current.clamp(0.0, 100.0);
        self.peak = self.peak.max(self.current);
        self.current
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    pub fn accumulation(&self) -> f64 {
        self.accumulation
    }

    pub fn reset(&mut self) {
        self.current = STRESS_BASELINE;
        self.peak = STRESS_BASELINE;
        self.accumulation = 0.0;
    }
}

/// Notable stress transition flagged for analytics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StressEvent {
    /// Short-window average rose sharply above the long-window average
    RapidIncrease { delta: f64 },
    /// Stress stayed above the high threshold for many consecutive ticks
    SustainedHigh { ticks: u32 },
    /// Short-window average dropped well below the long-window average
    Recovery { delta: f64 },
}

/// Rolling-average comparator over the stress stream
#[derive(Debug, Clone, Default)]
pub struct StressEventDetector {
    history: VecDeque<f64>,
    high_ticks: u32,
    rapid_active: bool,
    sustained_active: bool,
    recovery_active: bool,
    event_count: u32,
}

impl StressEventDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one smoothed stress value; returns events that fired this tick
    pub fn push(&mut self, value: f64) -> Vec<StressEvent> {
        self.history.push_back(value);
        while self.history.len() > LONG_WINDOW {
            self.history.pop_front();
        }

        if value > HIGH_STRESS_LEVEL {
            self.high_ticks += 1;
        } else {
            self.high_ticks = 0;
        }

        let mut events = Vec::new();

        if self.history.len() >= LONG_WINDOW {
            let short = self.tail_mean(SHORT_WINDOW);
            let long = self.tail_mean(LONG_WINDOW);
            let delta = short - long;

            let rapid = delta > RAPID_INCREASE_DELTA;
            if rapid && !self.rapid_active {
                events.push(StressEvent::RapidIncrease { delta });
            }
            self.rapid_active = rapid;

            let recovering = -delta > RECOVERY_DELTA;
            if recovering && !self.recovery_active {
                events.push(StressEvent::Recovery { delta: -delta });
            }
            self.recovery_active = recovering;
        }

        let sustained = self.high_ticks > SUSTAINED_HIGH_TICKS;
        if sustained && !self.sustained_active {
            events.push(StressEvent::SustainedHigh {
                ticks: self.high_ticks,
            });
        }
        self.sustained_active = sustained;

        self.event_count += events.len() as u32;
        events
    }

    fn tail_mean(&self, count: usize) -> f64 {
        let take = count.min(self.history.len());
        if take == 0 {
            return 0.0;
        }
        self.history.iter().rev().take(take).sum::<f64>() / take as f64
    }

    pub fn event_count(&self) -> u32 {
        self.event_count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
