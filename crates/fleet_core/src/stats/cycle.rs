//! Cycle-stationary analysis: bins sharing a phase of the cycle (say, the same
//! hour of the day) form one sample, with an interval per phase.

use serde::{Deserialize, Serialize};

use crate::stats::batch_means::batch_means_interval;
use crate::stats::series::MetricSeries;
use crate::stats::IntervalOutcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseInterval {
    pub phase: usize,
    /// Offset of the phase from the start of the cycle.
    pub phase_start_ms: u64,
    pub samples: usize,
    pub outcome: IntervalOutcome,
}

/// Number of phases in a cycle (a trailing partial bin counts as a phase).
pub fn phase_count(cycle_length_ms: u64, bin_interval_ms: u64) -> usize {
    if bin_interval_ms == 0 {
        return 0;
    }
    cycle_length_ms.div_ceil(bin_interval_ms) as usize
}

/// `⌊(start_ms mod cycle) / bin_interval⌋`.
pub fn phase_of(start_ms: u64, cycle_length_ms: u64, bin_interval_ms: u64) -> usize {
    if cycle_length_ms == 0 || bin_interval_ms == 0 {
        return 0;
    }
    ((start_ms % cycle_length_ms) / bin_interval_ms) as usize
}

/// Groups `series` by phase and computes an independent batch-means interval
/// for each phase. Phases with too few samples report insufficient data.
pub fn cycle_phase_intervals(
    series: &MetricSeries,
    bin_interval_ms: u64,
    cycle_length_ms: u64,
    batch_size: usize,
    confidence_level: f64,
    min_samples: usize,
) -> Vec<PhaseInterval> {
    let phases = phase_count(cycle_length_ms, bin_interval_ms);
    let mut grouped: Vec<Vec<f64>> = vec![Vec::new(); phases];
    for point in &series.points {
        let phase = phase_of(point.start_ms, cycle_length_ms, bin_interval_ms);
        if let Some(group) = grouped.get_mut(phase) {
            group.push(point.value);
        }
    }

    grouped
        .into_iter()
        .enumerate()
        .map(|(phase, values)| PhaseInterval {
            phase,
            phase_start_ms: phase as u64 * bin_interval_ms,
            samples: values.len(),
            outcome: batch_means_interval(&values, batch_size, confidence_level, min_samples)
                .into(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::series::{BinMetric, SeriesPoint};

    fn series(points: &[(u64, f64)]) -> MetricSeries {
        MetricSeries {
            metric: BinMetric::SuccessRate,
            points: points
                .iter()
                .enumerate()
                .map(|(i, (start_ms, value))| SeriesPoint {
                    bin_index: i,
                    start_ms: *start_ms,
                    value: *value,
                })
                .collect(),
        }
    }

    #[test]
    fn phase_uses_bin_start_within_cycle() {
        assert_eq!(phase_of(0, 100, 25), 0);
        assert_eq!(phase_of(125, 100, 25), 1);
        assert_eq!(phase_of(399, 100, 25), 3);
        assert_eq!(phase_count(100, 25), 4);
        assert_eq!(phase_count(100, 30), 4);
    }

    #[test]
    fn each_phase_gets_its_own_interval() {
        // Cycle of two bins; phase 0 hovers around 1.0, phase 1 around 0.5.
        let data = series(&[
            (0, 1.0),
            (10, 0.5),
            (20, 1.1),
            (30, 0.4),
            (40, 0.9),
            (50, 0.6),
        ]);
        let phases = cycle_phase_intervals(&data, 10, 20, 1, 0.95, 2);
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].samples, 3);

        let IntervalOutcome::Interval(first) = &phases[0].outcome else {
            panic!("phase 0 should have an interval");
        };
        let IntervalOutcome::Interval(second) = &phases[1].outcome else {
            panic!("phase 1 should have an interval");
        };
        assert!((first.mean - 1.0).abs() < 1e-12);
        assert!((second.mean - 0.5).abs() < 1e-12);
    }

    #[test]
    fn sparse_phase_is_insufficient_alone() {
        let data = series(&[(0, 1.0), (20, 1.0), (40, 1.2), (30, 0.4)]);
        let phases = cycle_phase_intervals(&data, 10, 20, 1, 0.95, 2);
        assert!(matches!(phases[0].outcome, IntervalOutcome::Interval(_)));
        assert_eq!(
            phases[1].outcome,
            IntervalOutcome::InsufficientData {
                available: 1,
                required: 2
            }
        );
    }
}
