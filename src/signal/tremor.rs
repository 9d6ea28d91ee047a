//! Hand-steadiness estimators
//!
//! Two rolling-window processors over the controller stream: a zero-crossing
//! tremor-frequency estimator tuned to the human tremor band, and an
//! aim-stability score over projected aim points.

use crate::sample::Vec3;
use std::collections::VecDeque;

/// Rolling window length for tremor estimation (seconds)
pub const TREMOR_WINDOW_SEC: f64 = 2.0;

/// Minimum samples before a frequency estimate is attempted
pub const TREMOR_MIN_SAMPLES: usize = 30;

/// Human tremor band (Hz)
pub const TREMOR_BAND_LOW_HZ: f64 = 4.0;
pub const TREMOR_BAND_HIGH_HZ: f64 = 12.0;

/// Rolling window length for aim stability (seconds)
pub const AIM_WINDOW_SEC: f64 = 1.0;

/// Forward projection distance for aim points (meters)
pub const AIM_PROJECTION_M: f64 = 10.0;

/// Mean spread that maps to zero aim stability (meters)
pub const AIM_SPREAD_NORMALIZER_M: f64 = 0.5;

/// Zero-crossing tremor-frequency estimator over linear-velocity samples
#[derive(Debug, Clone, Default)]
pub struct TremorEstimator {
    window: VecDeque<(f64, f64)>,
    frequency_hz: f64,
    intensity: f64,
}

impl TremorEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one linear-speed sample (m/s) at simulation time `now`
    pub fn push(&mut self, now: f64, speed: f64) {
        self.window.push_back((now, speed));
        while let Some(&(t, _)) = self.window.front() {
            if now - t > TREMOR_WINDOW_SEC {
                self.window.pop_front();
            } else {
                break;
            }
        }

        if self.window.len() >= TREMOR_MIN_SAMPLES {
            self.estimate();
        }
    }

    /// Dominant frequency via zero crossings about the window mean
    fn estimate(&mut self) {
        let n = self.window.len();
        let span = match (self.window.front(), self.window.back()) {
            (Some(&(first, _)), Some(&(last, _))) => last - first,
            _ => return,
        };
        if span <= 0.0 {
            return;
        }

        let mean = self.window.iter().map(|(_, v)| v).sum::<f64>() / n as f64;

        let mut crossings = 0u32;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut prev_sign = 0i8;
        for &(_, v) in &self.window {
            min = min.min(v);
            max = max.max(v);
            let sign = if v - mean > 0.0 {
                1
            } else if v - mean < 0.0 {
                -1
            } else {
                0
            };
            if sign != 0 {
                if prev_sign != 0 && sign != prev_sign {
                    crossings += 1;
                }
                prev_sign = sign;
            }
        }

        self.frequency_hz = crossings as f64 / (2.0 * span);
        self.intensity = if (TREMOR_BAND_LOW_HZ..=TREMOR_BAND_HIGH_HZ).contains(&self.frequency_hz)
        {
            (max - min) * (self.frequency_hz / TREMOR_BAND_HIGH_HZ)
        } else {
            0.0
        };
    }

    /// Latest dominant-frequency estimate (Hz)
    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    /// Tremor score (0-100)
    pub fn score(&self) -> f64 {
        (self.intensity / 10.0).clamp(0.0, 1.0) * 100.0
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Aim-stability score over a rolling window of projected aim points
#[derive(Debug, Clone, Default)]
pub struct AimStability {
    window: VecDeque<(f64, Vec3)>,
}

impl AimStability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one controller pose as origin + forward direction
    pub fn push(&mut self, now: f64, origin: Vec3, forward: Vec3) {
        let aim_point = origin + forward.normalized() * AIM_PROJECTION_M;
        self.window.push_back((now, aim_point));
        while let Some(&(t, _)) = self.window.front() {
            if now - t > AIM_WINDOW_SEC {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Stability score (0-100); an empty window scores 0
    pub fn score(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }

        let n = self.window.len() as f64;
        let centroid = self
            .window
            .iter()
            .fold(Vec3::ZERO, |acc, (_, p)| acc + *p)
            * (1.0 / n);
        let mean_dist = self
            .window
            .iter()
            .map(|(_, p)| p.distance(centroid))
            .sum::<f64>()
            / n;

        (1.0 - mean_dist / AIM_SPREAD_NORMALIZER_M).clamp(0.0, 1.0) * 100.0
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE_HZ: f64 = 60.0;

    #[test]
    fn test_constant_motion_scores_zero() {
        let mut estimator = TremorEstimator::new();
        for i in 0..1000 {
            estimator.push(i as f64 / RATE_HZ, 1.5);
        }
        assert_eq!(estimator.score(), 0.0);
        assert_eq!(estimator.frequency_hz(), 0.0);
    }

    #[test]
    fn test_band_oscillation_detected() {
        let mut estimator = TremorEstimator::new();
        // 8 Hz oscillation sampled at 60 Hz
        for i in 0..240 {
            let t = i as f64 / RATE_HZ;
            let speed = 1.0 + (2.0 * std::f64::consts::PI * 8.0 * t).sin();
            estimator.push(t, speed);
        }
        assert!((estimator.frequency_hz() - 8.0).abs() < 1.0);
        assert!(estimator.score() > 0.0);
    }

    #[test]
    fn test_slow_oscillation_outside_band() {
        let mut estimator = TremorEstimator::new();
        // 1 Hz is below the tremor band
        for i in 0..240 {
            let t = i as f64 / RATE_HZ;
            let speed = 1.0 + (2.0 * std::f64::consts::PI * 1.0 * t).sin();
            estimator.push(t, speed);
        }
        assert!(estimator.frequency_hz() < TREMOR_BAND_LOW_HZ);
        assert_eq!(estimator.score(), 0.0);
    }

    #[test]
    fn test_window_eviction() {
        let mut estimator = TremorEstimator::new();
        for i in 0..600 {
            estimator.push(i as f64 / RATE_HZ, 1.0);
        }
        // 2s at 60 Hz keeps ~121 samples
        assert!(estimator.sample_count() <= 122);
    }

    #[test]
    fn test_steady_aim_scores_high() {
        let mut aim = AimStability::new();
        for i in 0..120 {
            aim.push(i as f64 / RATE_HZ, Vec3::ZERO, Vec3::FORWARD);
        }
        assert!((aim.score() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_scattered_aim_scores_low() {
        let mut aim = AimStability::new();
        for i in 0..60 {
            let t = i as f64 / RATE_HZ;
            // Alternate between two directions ~11 degrees apart
            let dir = if i % 2 == 0 {
                Vec3::FORWARD
            } else {
                Vec3::new(0.2, 0.0, 1.0)
            };
            aim.push(t, Vec3::ZERO, dir);
        }
        // ~1m mean spread at 10m projection exceeds the 0.5m normalizer
        assert_eq!(aim.score(), 0.0);
    }

    #[test]
    fn test_aim_reset() {
        let mut aim = AimStability::new();
        aim.push(0.0, Vec3::ZERO, Vec3::FORWARD);
        aim.reset();
        assert_eq!(aim.sample_count(), 0);
        assert_eq!(aim.score(), 0.0);
    }
}
