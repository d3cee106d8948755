//! Descriptive statistics for one metric within one group
//!
//! Standard deviation is the sample (n - 1) estimator. The coefficient of
//! variation is reported in percent and falls back to 0 for a single sample
//! or a zero mean.

use serde::Serialize;

/// Half-width of the tolerance band, in standard deviations
pub const BAND_SIGMAS: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupStatistics {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    /// stddev / mean * 100
    pub coefficient_of_variation: f64,
}

impl GroupStatistics {
    /// Compute statistics over finite values; `None` when there are none
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }

        let count = finite.len();
        let sum: f64 = finite.iter().sum();
        let mean = sum / count as f64;

        let stddev = if count > 1 {
            let squares: f64 = finite.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let coefficient_of_variation = if count <= 1 || mean == 0.0 {
            0.0
        } else {
            stddev / mean * 100.0
        };

        Some(Self {
            count,
            sum,
            mean,
            stddev,
            min,
            max,
            coefficient_of_variation,
        })
    }

    pub fn lower_band(&self) -> f64 {
        self.mean - BAND_SIGMAS * self.stddev
    }

    pub fn upper_band(&self) -> f64 {
        self.mean + BAND_SIGMAS * self.stddev
    }
}
