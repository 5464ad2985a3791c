//! Batch-means confidence intervals.

use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::stats::series::{mean, sample_std_dev};
use crate::stats::student_t;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub half_width: f64,
    pub lower: f64,
    pub upper: f64,
    pub confidence_level: f64,
    /// Number of batch means the interval was computed from.
    pub num_batches: usize,
    pub batch_size: usize,
    /// Sample standard deviation of the batch means.
    pub std_dev: f64,
}

impl ConfidenceInterval {
    pub fn contains(&self, value: f64) -> bool {
        (self.lower..=self.upper).contains(&value)
    }
}

/// `mean ± t_{k-1, 1-α/2} · s / √k` over `samples` treated as independent.
pub fn interval_from_samples(
    samples: &[f64],
    confidence_level: f64,
) -> Result<ConfidenceInterval, StatsError> {
    let k = samples.len();
    if k < 2 {
        return Err(StatsError::InsufficientData {
            available: k,
            required: 2,
        });
    }
    let m = mean(samples);
    let s = sample_std_dev(samples);
    let alpha = 1.0 - confidence_level;
    let t = student_t::quantile(1.0 - alpha / 2.0, (k - 1) as f64);
    let half_width = t * s / (k as f64).sqrt();
    Ok(ConfidenceInterval {
        mean: m,
        half_width,
        lower: m - half_width,
        upper: m + half_width,
        confidence_level,
        num_batches: k,
        batch_size: 1,
        std_dev: s,
    })
}

/// Lag-`lag` sample autocorrelation; 0 for a constant series.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    let n = values.len();
    if lag >= n {
        return 0.0;
    }
    let m = mean(values);
    let denominator: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    if denominator <= f64::EPSILON {
        return 0.0;
    }
    let numerator: f64 = (0..n - lag)
        .map(|i| (values[i] - m) * (values[i + lag] - m))
        .sum();
    numerator / denominator
}

/// Smallest lag whose autocorrelation magnitude drops below `cutoff`, used as
/// the batch size; capped so that at least `min_batches` batches remain.
pub fn autocorrelation_batch_size(values: &[f64], cutoff: f64, min_batches: usize) -> usize {
    let cap = (values.len() / min_batches.max(1)).max(1);
    (1..=cap)
        .find(|lag| autocorrelation(values, *lag).abs() < cutoff)
        .unwrap_or(cap)
}

/// Batch means over `values`. Leading values that do not fill a batch are
/// dropped, so the batches end with the most recent observation.
pub fn batch_means(values: &[f64], batch_size: usize) -> Vec<f64> {
    let batch_size = batch_size.max(1);
    let remainder = values.len() % batch_size;
    values[remainder..]
        .chunks_exact(batch_size)
        .map(mean)
        .collect()
}

pub fn batch_means_interval(
    values: &[f64],
    batch_size: usize,
    confidence_level: f64,
    min_batches: usize,
) -> Result<ConfidenceInterval, StatsError> {
    let batch_size = batch_size.max(1);
    let means = batch_means(values, batch_size);
    let required = min_batches.max(2);
    if means.len() < required {
        return Err(StatsError::InsufficientData {
            available: means.len(),
            required,
        });
    }
    let mut interval = interval_from_samples(&means, confidence_level)?;
    interval.batch_size = batch_size;
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_matches_hand_computation() {
        let samples = [10.0, 12.0, 11.0, 13.0, 9.0, 11.0];
        let ci = interval_from_samples(&samples, 0.95).unwrap();
        assert!((ci.mean - 11.0).abs() < 1e-12);
        // s = sqrt(10 / 5), t_{5, 0.975} = 2.5706
        let expected = 2.570_58 * 2f64.sqrt() / 6f64.sqrt();
        assert!((ci.half_width - expected).abs() < 1e-3, "{}", ci.half_width);
        assert!(ci.contains(11.0));
        assert_eq!(ci.num_batches, 6);
    }

    #[test]
    fn batches_drop_leading_remainder() {
        let values = [100.0, 1.0, 3.0, 5.0, 7.0];
        assert_eq!(batch_means(&values, 2), vec![2.0, 6.0]);
    }

    #[test]
    fn too_few_batches_is_insufficient() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(
            batch_means_interval(&values, 2, 0.95, 5),
            Err(StatsError::InsufficientData {
                available: 3,
                required: 5
            })
        );
        assert!(batch_means_interval(&values, 2, 0.95, 0).is_ok());
    }

    #[test]
    fn half_width_shrinks_as_batches_accumulate() {
        let values: Vec<f64> = (0..64).map(|i| (i % 2) as f64).collect();
        let mut previous = f64::INFINITY;
        for k in [4usize, 8, 16, 32, 64] {
            let ci = batch_means_interval(&values[..k], 1, 0.95, 2).unwrap();
            assert!(ci.half_width <= previous, "k={k}: {} > {previous}", ci.half_width);
            previous = ci.half_width;
        }
    }

    #[test]
    fn independent_series_uses_unit_batches() {
        let values: Vec<f64> = (0..40).map(|i| (i % 2) as f64).collect();
        // Alternating series: lag-1 autocorrelation is about -1, lag-2 about +1.
        assert!(autocorrelation(&values, 1) < -0.9);
        let constant = vec![3.0; 20];
        assert_eq!(autocorrelation_batch_size(&constant, 0.2, 5), 1);
    }

    #[test]
    fn correlated_series_gets_larger_batches() {
        // Slow square wave with period 20: neighbours are strongly correlated.
        let values: Vec<f64> = (0..200).map(|i| ((i / 10) % 2) as f64).collect();
        let size = autocorrelation_batch_size(&values, 0.2, 10);
        assert!(size > 1, "batch size {size}");
        assert!(size <= 20);
    }
}
