//! Output analysis over the bin sequence: warm-up detection, batch-means
//! confidence intervals and the cycle-stationary per-phase variant.

pub mod batch_means;
pub mod cycle;
pub mod series;
pub mod student_t;
pub mod transient;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::{ONE_HOUR_MS, ONE_MIN_MS};
use crate::error::StatsError;
use crate::telemetry::Bin;

pub use batch_means::{
    autocorrelation, autocorrelation_batch_size, batch_means, batch_means_interval,
    interval_from_samples, ConfidenceInterval,
};
pub use cycle::{cycle_phase_intervals, PhaseInterval};
pub use series::{BinMetric, MetricSeries, SeriesPoint};
pub use transient::{detect_transient, welch_moving_average, TransientResult};

/// Whether the system settles to one steady state or repeats a daily pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemType {
    #[default]
    Stationary,
    CycleStationary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub confidence_level: f64,
    /// Fewest usable bins for transient detection.
    pub min_bins: usize,
    /// Relative half-width of the stabilization band.
    pub tolerance: f64,
    /// Band floor for metrics whose reference is (close to) zero.
    pub absolute_tolerance: f64,
    /// Largest moving-average half-width as a fraction of the series length.
    pub window_fraction: f64,
    /// Fixed batch size; derived from the autocorrelation when unset.
    pub batch_size: Option<usize>,
    pub min_batches: usize,
    pub autocorrelation_cutoff: f64,
    pub bin_interval_ms: u64,
    pub cycle_length_ms: u64,
    /// Cycles averaged into one sample per phase.
    pub cycle_batch_size: usize,
    pub min_cycles: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            min_bins: 10,
            tolerance: 0.05,
            absolute_tolerance: 1e-6,
            window_fraction: 0.25,
            batch_size: None,
            min_batches: 5,
            autocorrelation_cutoff: 0.2,
            bin_interval_ms: ONE_HOUR_MS,
            cycle_length_ms: 24 * ONE_HOUR_MS,
            cycle_batch_size: 1,
            min_cycles: 2,
        }
    }
}

impl StatsConfig {
    pub fn with_confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_min_bins(mut self, min_bins: usize) -> Self {
        self.min_bins = min_bins;
        self
    }

    pub fn with_bin_interval_mins(mut self, mins: u64) -> Self {
        self.bin_interval_ms = mins * ONE_MIN_MS;
        self
    }

    pub fn with_cycle_length_mins(mut self, mins: u64) -> Self {
        self.cycle_length_ms = mins * ONE_MIN_MS;
        self
    }
}

/// Analysis settings carried by the world so the report can be computed from
/// the world alone.
#[derive(Debug, Clone, Default, Resource)]
pub struct AnalysisSettings {
    pub system_type: SystemType,
    pub config: StatsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntervalOutcome {
    Interval(ConfidenceInterval),
    InsufficientData { available: usize, required: usize },
}

impl IntervalOutcome {
    pub fn interval(&self) -> Option<&ConfidenceInterval> {
        match self {
            IntervalOutcome::Interval(ci) => Some(ci),
            IntervalOutcome::InsufficientData { .. } => None,
        }
    }
}

impl From<Result<ConfidenceInterval, StatsError>> for IntervalOutcome {
    fn from(result: Result<ConfidenceInterval, StatsError>) -> Self {
        match result {
            Ok(ci) => IntervalOutcome::Interval(ci),
            Err(StatsError::InsufficientData {
                available,
                required,
            }) => IntervalOutcome::InsufficientData {
                available,
                required,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Stationary {
        transient: TransientResult,
        interval: IntervalOutcome,
    },
    CycleStationary {
        phases: Vec<PhaseInterval>,
    },
    InsufficientData {
        available: usize,
        required: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAnalysis {
    pub metric: BinMetric,
    pub system_type: SystemType,
    /// Bins where the metric was defined.
    pub usable_bins: usize,
    pub outcome: AnalysisOutcome,
}

impl MetricAnalysis {
    /// Steady-state interval of a stationary analysis, when one was computed.
    pub fn steady_state_interval(&self) -> Option<&ConfidenceInterval> {
        match &self.outcome {
            AnalysisOutcome::Stationary { interval, .. } => interval.interval(),
            _ => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        match &self.outcome {
            AnalysisOutcome::InsufficientData { .. } => true,
            AnalysisOutcome::Stationary { interval, .. } => interval.interval().is_none(),
            AnalysisOutcome::CycleStationary { phases } => {
                phases.iter().all(|p| p.outcome.interval().is_none())
            }
        }
    }
}

fn insufficient(available: usize, required: usize) -> AnalysisOutcome {
    AnalysisOutcome::InsufficientData {
        available,
        required,
    }
}

/// Runs the full analysis for one metric over `bins`.
///
/// Stationary systems get transient detection followed by a batch-means
/// interval over the steady-state values. Cycle-stationary systems get one
/// interval per phase of the cycle.
pub fn analyze_metric(
    bins: &[Bin],
    metric: BinMetric,
    system_type: SystemType,
    config: &StatsConfig,
) -> MetricAnalysis {
    let series = MetricSeries::from_bins(bins, metric);
    let usable_bins = series.len();

    let outcome = match system_type {
        SystemType::Stationary => {
            let values = series.values();
            match detect_transient(&values, config) {
                Err(StatsError::InsufficientData {
                    available,
                    required,
                }) => insufficient(available, required),
                Ok(mut transient) => {
                    if let Some(point) = series.points.get(transient.end_position) {
                        transient.end_bin_index = point.bin_index;
                    }
                    let steady = &values[transient.end_position..];
                    let batch_size = config.batch_size.unwrap_or_else(|| {
                        autocorrelation_batch_size(
                            steady,
                            config.autocorrelation_cutoff,
                            config.min_batches,
                        )
                    });
                    let interval = batch_means_interval(
                        steady,
                        batch_size,
                        config.confidence_level,
                        config.min_batches,
                    )
                    .into();
                    AnalysisOutcome::Stationary {
                        transient,
                        interval,
                    }
                }
            }
        }
        SystemType::CycleStationary => {
            if usable_bins < 2 {
                insufficient(usable_bins, 2)
            } else {
                AnalysisOutcome::CycleStationary {
                    phases: cycle_phase_intervals(
                        &series,
                        config.bin_interval_ms,
                        config.cycle_length_ms,
                        config.cycle_batch_size,
                        config.confidence_level,
                        config.min_cycles,
                    ),
                }
            }
        }
    };

    MetricAnalysis {
        metric,
        system_type,
        usable_bins,
        outcome,
    }
}
