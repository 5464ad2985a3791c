//! Result rows extracted from completed simulations.

use fleet_core::report::SimulationReport;
use fleet_core::stats::BinMetric;
use serde::{Deserialize, Serialize};

use crate::parameters::ParameterSet;

/// One flat row per run: the swept parameters plus headline metrics.
/// Ratios are `None` when their denominator was zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub experiment_id: String,
    pub run_id: usize,
    pub seed: u64,
    pub num_cars: usize,
    pub num_stations: usize,
    pub station_capacity: usize,
    pub num_relocators: usize,
    pub arrival_rate_per_min: f64,
    pub horizon_mins: f64,
    pub users_arrived: u64,
    pub reservation_attempts: u64,
    pub reservation_successes: u64,
    pub users_abandoned: u64,
    pub trips_completed: u64,
    pub charging_sessions_completed: u64,
    pub relocations_completed: u64,
    /// Cars still waiting for a relocator at the horizon.
    pub stalled_relocations: usize,
    pub success_rate: Option<f64>,
    pub abandonment_rate: Option<f64>,
    pub average_trip_distance: Option<f64>,
    pub utilization: Option<f64>,
    pub charging_rate: Option<f64>,
    pub idle_rate: Option<f64>,
    pub bin_count: usize,
    /// Steady-state success rate interval from batch means over the bins.
    pub steady_success_rate: Option<f64>,
    pub steady_success_rate_lower: Option<f64>,
    pub steady_success_rate_upper: Option<f64>,
    pub steady_success_rate_half_width: Option<f64>,
}

/// Reduce one finished run to its result row.
pub fn extract_result(param_set: &ParameterSet, report: &SimulationReport) -> ExperimentResult {
    let params = &param_set.params;
    let counters = &report.counters;
    let steady = report
        .analysis(BinMetric::SuccessRate)
        .and_then(|analysis| analysis.steady_state_interval());

    ExperimentResult {
        experiment_id: param_set.experiment_id.clone(),
        run_id: param_set.run_id,
        seed: param_set.seed,
        num_cars: params.num_cars,
        num_stations: params.num_stations,
        station_capacity: params.station_capacity,
        num_relocators: params.num_relocators,
        arrival_rate_per_min: params.arrival_rate_per_min,
        horizon_mins: params.horizon_mins,
        users_arrived: counters.users_arrived,
        reservation_attempts: counters.reservation_attempts,
        reservation_successes: counters.reservation_successes,
        users_abandoned: counters.users_abandoned,
        trips_completed: counters.trips_completed,
        charging_sessions_completed: counters.charging_sessions_completed,
        relocations_completed: counters.relocations_completed,
        stalled_relocations: report.stalled_relocations,
        success_rate: report.rates.success_rate,
        abandonment_rate: report.rates.abandonment_rate,
        average_trip_distance: report.rates.average_trip_distance,
        utilization: report.rates.utilization,
        charging_rate: report.rates.charging_rate,
        idle_rate: report.rates.idle_rate,
        bin_count: report.bin_count,
        steady_success_rate: steady.map(|ci| ci.mean),
        steady_success_rate_lower: steady.map(|ci| ci.lower),
        steady_success_rate_upper: steady.map(|ci| ci.upper),
        steady_success_rate_half_width: steady.map(|ci| ci.half_width),
    }
}

#[cfg(test)]
pub(crate) fn sample_result(experiment_id: &str, success_rate: Option<f64>) -> ExperimentResult {
    ExperimentResult {
        experiment_id: experiment_id.to_string(),
        run_id: 0,
        seed: 1,
        num_cars: 20,
        num_stations: 5,
        station_capacity: 2,
        num_relocators: 3,
        arrival_rate_per_min: 0.1,
        horizon_mins: 1440.0,
        users_arrived: 150,
        reservation_attempts: 180,
        reservation_successes: 120,
        users_abandoned: 20,
        trips_completed: 115,
        charging_sessions_completed: 12,
        relocations_completed: 9,
        stalled_relocations: 1,
        success_rate,
        abandonment_rate: Some(20.0 / 150.0),
        average_trip_distance: Some(14.2),
        utilization: Some(0.31),
        charging_rate: Some(0.08),
        idle_rate: Some(0.55),
        bin_count: 24,
        steady_success_rate: success_rate,
        steady_success_rate_lower: success_rate.map(|r| r - 0.05),
        steady_success_rate_upper: success_rate.map(|r| r + 0.05),
        steady_success_rate_half_width: success_rate.map(|_| 0.05),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::runner::run_scenario;
    use fleet_core::scenario::ScenarioParams;

    #[test]
    fn test_extract_result_copies_report() {
        let params = ScenarioParams::default().with_horizon_mins(2.0 * 24.0 * 60.0);
        let set = ParameterSet::new(params, "exp_0".to_string(), 0, 17);
        let outcome = run_scenario(set.scenario_params()).expect("runs");
        let result = extract_result(&set, &outcome.report);

        assert_eq!(result.seed, 17);
        assert_eq!(result.num_cars, 20);
        assert_eq!(result.trips_completed, outcome.report.counters.trips_completed);
        assert_eq!(result.success_rate, outcome.report.rates.success_rate);
        assert_eq!(result.bin_count, 48);
        if let (Some(lower), Some(mean), Some(upper)) = (
            result.steady_success_rate_lower,
            result.steady_success_rate,
            result.steady_success_rate_upper,
        ) {
            assert!(lower <= mean && mean <= upper);
        }
    }
}
