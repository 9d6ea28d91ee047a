//! Descriptive statistics helpers
//!
//! Shared numeric building blocks for metric reports: batch summaries,
//! percentiles, normalized entropy, and small streaming accumulators.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Batch summary over a sample set
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Summarize a sample set; an empty set yields all zeros
pub fn summarize(values: &[f64]) -> SummaryStats {
    if values.is_empty() {
        return SummaryStats::default();
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let median = if sorted.len() % 2 == 1 {
        sorted[sorted.len() / 2]
    } else {
        let hi = sorted.len() / 2;
        (sorted[hi - 1] + sorted[hi]) / 2.0
    };

    SummaryStats {
        count: values.len(),
        mean,
        median,
        std_dev: variance.sqrt(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
    }
}

/// Percentile by rank: index = clamp(ceil(p/100 * n) - 1, 0, n - 1)
///
/// Returns 0 for an empty sample set.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let rank = (p / 100.0 * n as f64).ceil() as isize - 1;
    let index = rank.clamp(0, n as isize - 1) as usize;
    sorted[index]
}

/// Shannon entropy (base 2) over time shares, normalized by log2(category count)
///
/// Input weights are arbitrary nonnegative dwell times; zero-weight entries are
/// ignored. Fewer than two nonzero categories yield 0.
pub fn normalized_entropy(weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    let nonzero = weights.iter().filter(|w| **w > 0.0).count();
    if nonzero < 2 || total <= 0.0 {
        return 0.0;
    }

    let entropy: f64 = weights
        .iter()
        .filter(|w| **w > 0.0)
        .map(|w| {
            let share = w / total;
            -share * share.log2()
        })
        .sum();

    (entropy / (nonzero as f64).log2()).clamp(0.0, 1.0)
}

/// Streaming count/mean/min/max accumulator
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StreamingStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl StreamingStats {
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.mean = value;
            self.min = value;
            self.max = value;
        } else {
            self.mean += (value - self.mean) / self.count as f64;
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Bounded moving average with FIFO eviction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovingAverage {
    window: VecDeque<f64>,
    cap: usize,
}

impl MovingAverage {
    pub fn new(cap: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(cap.max(1)),
            cap: cap.max(1),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.window.push_back(value);
        while self.window.len() > self.cap {
            self.window.pop_front();
        }
    }

    pub fn mean(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        Some(self.window.iter().sum::<f64>() / self.window.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.window.len() == self.cap
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_basic() {
        let stats = summarize(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(stats.count, 5);
        assert!((stats.mean - 3.0).abs() < 1e-9);
        assert!((stats.median - 3.0).abs() < 1e-9);
        assert!((stats.min - 1.0).abs() < 1e-9);
        assert!((stats.max - 5.0).abs() < 1e-9);
        // Population std dev of 1..5 = sqrt(2)
        assert!((stats.std_dev - 2.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_even_median() {
        let stats = summarize(&[4.0, 1.0, 3.0, 2.0]);
        assert!((stats.median - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_empty() {
        let stats = summarize(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
    }

    #[test]
    fn test_percentile_rank_cases() {
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], 50.0), 3.0);
        let one_to_ten: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        assert_eq!(percentile(&one_to_ten, 90.0), 9.0);
    }

    #[test]
    fn test_percentile_bounds() {
        let values = vec![10.0, 20.0, 30.0];
        assert_eq!(percentile(&values, 0.0), 10.0);
        assert_eq!(percentile(&values, 100.0), 30.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_entropy_uniform_is_one() {
        let entropy = normalized_entropy(&[2.0, 2.0, 2.0]);
        assert!((entropy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_entropy_single_category_is_zero() {
        assert_eq!(normalized_entropy(&[5.0]), 0.0);
        assert_eq!(normalized_entropy(&[5.0, 0.0, 0.0]), 0.0);
        assert_eq!(normalized_entropy(&[]), 0.0);
    }

    #[test]
    fn test_entropy_skewed_is_below_one() {
        let entropy = normalized_entropy(&[9.0, 1.0]);
        assert!(entropy > 0.0 && entropy < 1.0);
    }

    #[test]
    fn test_streaming_stats() {
        let mut stats = StreamingStats::default();
        for v in [2.0, 4.0, 6.0] {
            stats.add(v);
        }
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 4.0).abs() < 1e-9);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 6.0);
    }

    #[test]
    fn test_moving_average_window() {
        let mut avg = MovingAverage::new(3);
        assert_eq!(avg.mean(), None);

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            avg.push(v);
        }
        assert_eq!(avg.len(), 3);
        // Window holds 3, 4, 5
        assert!((avg.mean().unwrap() - 4.0).abs() < 1e-9);
    }
}
