//! End-of-run summary: cumulative counters, fleet usage, derived rates and
//! the per-metric statistical analysis.

use std::collections::BTreeMap;

use bevy_ecs::prelude::World;
use serde::{Deserialize, Serialize};

use crate::car::Car;
use crate::clock::{format_sim_time, SimulationClock};
use crate::registry::CarStateCounts;
use crate::relocator::{CarRelocator, RelocationBacklog};
use crate::station::ChargingStation;
use crate::stats::{
    analyze_metric, AnalysisOutcome, AnalysisSettings, BinMetric, MetricAnalysis, SystemType,
};
use crate::telemetry::{FleetUsage, MetricCounters, SimBins, SimTelemetry};

/// Headline rates over the whole run; `None` where the denominator was zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportRates {
    pub success_rate: Option<f64>,
    pub average_attempts: Option<f64>,
    pub average_attempts_before_success: Option<f64>,
    pub abandonment_rate: Option<f64>,
    pub average_trip_distance: Option<f64>,
    pub average_wait_mins: Option<f64>,
    pub average_walking_mins: Option<f64>,
    pub average_queue_length: Option<f64>,
    pub utilization: Option<f64>,
    pub charging_rate: Option<f64>,
    pub idle_rate: Option<f64>,
}

impl ReportRates {
    pub fn new(counters: &MetricCounters, usage: &FleetUsage) -> Self {
        Self {
            success_rate: counters.success_rate(),
            average_attempts: counters.average_attempts(),
            average_attempts_before_success: counters.average_attempts_before_success(),
            abandonment_rate: counters.abandonment_rate(),
            average_trip_distance: counters.average_trip_distance(),
            average_wait_mins: counters.average_wait_mins(),
            average_walking_mins: counters.average_walking_mins(),
            average_queue_length: counters.average_queue_length(),
            utilization: usage.utilization(),
            charging_rate: usage.charging_share(),
            idle_rate: usage.idle_share(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub end_ms: u64,
    pub counters: MetricCounters,
    pub usage: FleetUsage,
    pub rates: ReportRates,
    /// Cars still waiting for a relocator when the run ended.
    pub stalled_relocations: usize,
    pub cars_by_state: CarStateCounts,
    pub bin_count: usize,
    pub system_type: SystemType,
    pub analyses: Vec<MetricAnalysis>,
}

impl SimulationReport {
    /// Summarizes the world as it stands. Missing resources count as empty.
    pub fn capture(world: &mut World) -> Self {
        let end_ms = world
            .get_resource::<SimulationClock>()
            .map(|clock| clock.now())
            .unwrap_or(0);
        let counters = world
            .get_resource::<SimTelemetry>()
            .map(|telemetry| telemetry.counters)
            .unwrap_or_default();
        let stalled_relocations = world
            .get_resource::<RelocationBacklog>()
            .map(|backlog| backlog.len())
            .unwrap_or(0);
        let settings = world
            .get_resource::<AnalysisSettings>()
            .cloned()
            .unwrap_or_default();

        let mut cars = world.query::<&Car>();
        let mut stations = world.query::<&ChargingStation>();
        let mut relocators = world.query::<&CarRelocator>();
        let usage = FleetUsage::at(
            end_ms,
            cars.iter(world),
            stations.iter(world),
            relocators.iter(world),
        );
        let cars_by_state: CarStateCounts = cars.iter(world).collect();

        let (bin_count, analyses) = match world.get_resource::<SimBins>() {
            Some(bins) => (
                bins.len(),
                BinMetric::ALL
                    .iter()
                    .map(|metric| {
                        analyze_metric(bins.bins(), *metric, settings.system_type, &settings.config)
                    })
                    .collect(),
            ),
            None => (0, Vec::new()),
        };

        Self {
            end_ms,
            counters,
            usage,
            rates: ReportRates::new(&counters, &usage),
            stalled_relocations,
            cars_by_state,
            bin_count,
            system_type: settings.system_type,
            analyses,
        }
    }

    pub fn analysis(&self, metric: BinMetric) -> Option<&MetricAnalysis> {
        self.analyses.iter().find(|analysis| analysis.metric == metric)
    }

    /// Flat key-value view: counters, defined rates, fleet figures and the
    /// headline numbers of each metric's analysis (`<metric>.<figure>`).
    pub fn flat_record(&self) -> BTreeMap<String, f64> {
        let mut record = BTreeMap::new();

        if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(self.counters) {
            for (key, value) in fields {
                if let Some(number) = value.as_f64() {
                    record.insert(key, number);
                }
            }
        }
        if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(self.rates) {
            for (key, value) in fields {
                if let Some(number) = value.as_f64() {
                    record.insert(key, number);
                }
            }
        }

        record.insert("end_ms".to_string(), self.end_ms as f64);
        record.insert("stalled_relocations".to_string(), self.stalled_relocations as f64);
        record.insert("bin_count".to_string(), self.bin_count as f64);
        record.insert("car_time_ms".to_string(), self.usage.total_car_ms() as f64);
        record.insert("station_slot_ms".to_string(), self.usage.station_slot_ms as f64);
        record.insert("relocator_busy_ms".to_string(), self.usage.relocator_busy_ms as f64);
        if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(self.cars_by_state) {
            for (key, value) in fields {
                if let Some(number) = value.as_f64() {
                    record.insert(format!("cars_{key}"), number);
                }
            }
        }

        for analysis in &self.analyses {
            let name = analysis.metric.name();
            record.insert(format!("{name}.usable_bins"), analysis.usable_bins as f64);
            match &analysis.outcome {
                AnalysisOutcome::Stationary {
                    transient,
                    interval,
                } => {
                    record.insert(
                        format!("{name}.transient_end"),
                        transient.end_bin_index as f64,
                    );
                    record.insert(
                        format!("{name}.stabilized"),
                        if transient.stabilized { 1.0 } else { 0.0 },
                    );
                    record.insert(
                        format!("{name}.steady_state_mean"),
                        transient.steady_state_mean,
                    );
                    if let Some(ci) = interval.interval() {
                        record.insert(format!("{name}.ci_mean"), ci.mean);
                        record.insert(format!("{name}.ci_half_width"), ci.half_width);
                        record.insert(format!("{name}.ci_lower"), ci.lower);
                        record.insert(format!("{name}.ci_upper"), ci.upper);
                    }
                }
                AnalysisOutcome::CycleStationary { phases } => {
                    let covered = phases
                        .iter()
                        .filter(|phase| phase.outcome.interval().is_some())
                        .count();
                    record.insert(format!("{name}.phases"), phases.len() as f64);
                    record.insert(format!("{name}.phases_with_interval"), covered as f64);
                }
                AnalysisOutcome::InsufficientData { .. } => {}
            }
            record.insert(
                format!("{name}.insufficient_data"),
                if analysis.is_insufficient() { 1.0 } else { 0.0 },
            );
        }

        record
    }

    pub fn log_summary(&self) {
        let percent = |value: Option<f64>| {
            value
                .map(|v| format!("{:.1}%", v * 100.0))
                .unwrap_or_else(|| "n/a".to_string())
        };
        let c = &self.counters;
        log::info!("=== Simulation report at {} ===", format_sim_time(self.end_ms));
        log::info!(
            "users: {} arrived, {} abandoned | reservations: {} attempts, {} successes ({})",
            c.users_arrived,
            c.users_abandoned,
            c.reservation_attempts,
            c.reservation_successes,
            percent(self.rates.success_rate)
        );
        log::info!(
            "trips: {} completed, avg distance {:.2} | charging sessions: {} | relocations: {} done, {} stalled",
            c.trips_completed,
            self.rates.average_trip_distance.unwrap_or(0.0),
            c.charging_sessions_completed,
            c.relocations_completed,
            self.stalled_relocations
        );
        log::info!(
            "fleet: utilization {}, charging {}, idle {}",
            percent(self.rates.utilization),
            percent(self.rates.charging_rate),
            percent(self.rates.idle_rate)
        );
        for analysis in &self.analyses {
            match analysis.steady_state_interval() {
                Some(ci) => log::info!(
                    "{}: {:.4} ± {:.4} ({} batches of {})",
                    analysis.metric.name(),
                    ci.mean,
                    ci.half_width,
                    ci.num_batches,
                    ci.batch_size
                ),
                None => log::debug!(
                    "{}: no steady-state interval ({} usable bins)",
                    analysis.metric.name(),
                    analysis.usable_bins
                ),
            }
        }
    }
}
