//! Transient (warm-up) detection with Welch's moving-average method, turned
//! into an automatic rule: the warm-up ends where the smoothed series enters
//! a tolerance band around the mean of the final half and stays there.

use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::stats::series::{mean, sample_std_dev};
use crate::stats::StatsConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransientResult {
    /// Position in the analysed values where steady state begins.
    pub end_position: usize,
    /// Bin index of the first steady-state observation. Equals
    /// `end_position` until mapped through the series it was computed from.
    pub end_bin_index: usize,
    /// Moving-average window half-width that stabilized (0 when none did).
    pub window: usize,
    pub stabilized: bool,
    /// Mean of the final half of the series.
    pub reference: f64,
    pub band_half_width: f64,
    pub steady_state_mean: f64,
    pub steady_state_std_dev: f64,
    pub steady_state_len: usize,
}

/// Welch's centered moving average with half-width `w`; length `n - w`.
pub fn welch_moving_average(values: &[f64], w: usize) -> Vec<f64> {
    let n = values.len();
    if w >= n {
        return Vec::new();
    }
    (0..n - w)
        .map(|i| {
            if i < w {
                mean(&values[..=2 * i])
            } else {
                mean(&values[i - w..=i + w])
            }
        })
        .collect()
}

/// Start of the trailing run of `averages` inside `reference ± band`, if any.
fn tail_run_start(averages: &[f64], reference: f64, band: f64) -> Option<usize> {
    let inside = |v: &f64| (v - reference).abs() <= band;
    let trailing = averages.iter().rev().take_while(|v| inside(v)).count();
    (trailing > 0).then(|| averages.len() - trailing)
}

pub fn detect_transient(values: &[f64], config: &StatsConfig) -> Result<TransientResult, StatsError> {
    let n = values.len();
    let required = config.min_bins.max(2);
    if n < required {
        return Err(StatsError::InsufficientData {
            available: n,
            required,
        });
    }

    let half = n / 2;
    let reference = mean(&values[half..]);
    let band = (config.tolerance * reference.abs()).max(config.absolute_tolerance);

    let max_window = ((config.window_fraction * n as f64).floor() as usize)
        .max(1)
        .min(((n - 1) / 2).max(1));

    let found = (1..=max_window).find_map(|w| {
        let averages = welch_moving_average(values, w);
        tail_run_start(&averages, reference, band)
            .filter(|start| *start <= half)
            .map(|start| (w, start))
    });

    let (window, end_position, stabilized) = match found {
        Some((w, start)) => (w, start, true),
        None => (0, half, false),
    };
    let steady = &values[end_position..];
    Ok(TransientResult {
        end_position,
        end_bin_index: end_position,
        window,
        stabilized,
        reference,
        band_half_width: band,
        steady_state_mean: mean(steady),
        steady_state_std_dev: sample_std_dev(steady),
        steady_state_len: steady.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StatsConfig {
        StatsConfig {
            min_bins: 10,
            tolerance: 0.05,
            absolute_tolerance: 1e-9,
            window_fraction: 0.25,
            ..StatsConfig::default()
        }
    }

    #[test]
    fn moving_average_grows_window_at_the_start() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ma = welch_moving_average(&values, 2);
        assert_eq!(ma, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn ramp_then_constant_ends_where_ramp_stops() {
        // Linear warm-up over 10 bins, then flat at 10.
        let mut values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        values.extend(std::iter::repeat(10.0).take(30));

        let result = detect_transient(&values, &config()).expect("enough bins");
        assert!(result.stabilized);
        assert_eq!(result.window, 1);
        assert_eq!(result.end_position, 10);
        assert_eq!(result.steady_state_mean, 10.0);
        assert_eq!(result.steady_state_std_dev, 0.0);
        assert_eq!(result.steady_state_len, 30);
    }

    #[test]
    fn constant_series_has_no_warm_up() {
        let values = vec![0.8; 24];
        let result = detect_transient(&values, &config()).unwrap();
        assert!(result.stabilized);
        assert_eq!(result.end_position, 0);
    }

    #[test]
    fn drifting_series_does_not_stabilize() {
        let values: Vec<f64> = (0..20).map(|i| 1.0 + i as f64).collect();
        let result = detect_transient(&values, &config()).unwrap();
        assert!(!result.stabilized);
        assert_eq!(result.end_position, 10);
    }

    #[test]
    fn too_few_bins_is_insufficient() {
        assert_eq!(
            detect_transient(&[1.0, 2.0, 3.0], &config()),
            Err(StatsError::InsufficientData {
                available: 3,
                required: 10
            })
        );
    }
}
