//! Per-bin metric series extracted from the bin sequence.

use serde::{Deserialize, Serialize};

use crate::telemetry::Bin;

/// Metrics the statistics engine can analyse, one value per bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinMetric {
    SuccessRate,
    AverageAttempts,
    Utilization,
    ChargingShare,
    AverageTripDistance,
    TripsCompleted,
    Abandonments,
}

impl BinMetric {
    pub const ALL: [BinMetric; 7] = [
        BinMetric::SuccessRate,
        BinMetric::AverageAttempts,
        BinMetric::Utilization,
        BinMetric::ChargingShare,
        BinMetric::AverageTripDistance,
        BinMetric::TripsCompleted,
        BinMetric::Abandonments,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BinMetric::SuccessRate => "success_rate",
            BinMetric::AverageAttempts => "average_attempts",
            BinMetric::Utilization => "utilization",
            BinMetric::ChargingShare => "charging_share",
            BinMetric::AverageTripDistance => "average_trip_distance",
            BinMetric::TripsCompleted => "trips_completed",
            BinMetric::Abandonments => "abandonments",
        }
    }

    /// Value for `bin`, or `None` when the ratio's denominator was zero.
    pub fn value(self, bin: &Bin) -> Option<f64> {
        match self {
            BinMetric::SuccessRate => bin.ratios.success_rate,
            BinMetric::AverageAttempts => bin.ratios.average_attempts,
            BinMetric::Utilization => bin.ratios.utilization,
            BinMetric::ChargingShare => bin.ratios.charging_share,
            BinMetric::AverageTripDistance => bin.ratios.average_trip_distance,
            BinMetric::TripsCompleted => Some(bin.delta.trips_completed as f64),
            BinMetric::Abandonments => Some(bin.delta.users_abandoned as f64),
        }
    }
}

/// One usable observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub bin_index: usize,
    pub start_ms: u64,
    pub value: f64,
}

/// A metric over the bins where it is defined, in bin order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub metric: BinMetric,
    pub points: Vec<SeriesPoint>,
}

impl MetricSeries {
    pub fn from_bins(bins: &[Bin], metric: BinMetric) -> Self {
        let points = bins
            .iter()
            .filter_map(|bin| {
                metric.value(bin).filter(|v| v.is_finite()).map(|value| SeriesPoint {
                    bin_index: bin.index,
                    start_ms: bin.start_ms,
                    value,
                })
            })
            .collect();
        Self { metric, points }
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); 0 for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{FleetUsage, MetricCounters, SimBins};

    #[test]
    fn undefined_bins_are_skipped() {
        let mut bins = SimBins::new(10);
        let counters = |attempts, successes| MetricCounters {
            reservation_attempts: attempts,
            reservation_successes: successes,
            ..Default::default()
        };
        bins.record(10, counters(2, 1), FleetUsage::default());
        bins.record(20, counters(2, 1), FleetUsage::default());
        bins.record(30, counters(6, 5), FleetUsage::default());

        let series = MetricSeries::from_bins(bins.bins(), BinMetric::SuccessRate);
        assert_eq!(series.len(), 2);
        assert_eq!(series.points[0].bin_index, 0);
        assert_eq!(series.points[1].bin_index, 2);
        assert_eq!(series.values(), vec![0.5, 1.0]);

        let trips = MetricSeries::from_bins(bins.bins(), BinMetric::TripsCompleted);
        assert_eq!(trips.len(), 3);
    }

    #[test]
    fn moments() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), (32.0f64 / 7.0).sqrt());
        assert_eq!(sample_std_dev(&[3.0]), 0.0);
    }
}
