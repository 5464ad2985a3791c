//! Telemetry / KPIs: running counters, fleet time accounting and the periodic
//! bin sequence the statistics engine consumes.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::car::{Car, CarUsage};
use crate::clock::ONE_MIN_MS;
use crate::relocator::CarRelocator;
use crate::station::ChargingStation;

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator > 0.0 {
        Some(numerator / denominator)
    } else {
        None
    }
}

/// Monotone counters updated synchronously by the event handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricCounters {
    pub users_arrived: u64,
    /// Every reservation attempt, including retries.
    pub reservation_attempts: u64,
    pub reservation_successes: u64,
    pub reservation_failures: u64,
    /// Users that hit the retry cap and left.
    pub users_abandoned: u64,
    /// Sum over successful users of the attempts they needed.
    pub attempts_before_success_total: u64,
    pub trips_started: u64,
    pub trips_completed: u64,
    pub trip_distance_total: f64,
    /// First attempt to successful reservation.
    pub wait_time_ms_total: u64,
    /// Reservation to pickup.
    pub walking_time_ms_total: u64,
    pub charging_sessions_started: u64,
    pub charging_sessions_completed: u64,
    pub relocations_requested: u64,
    pub relocations_started: u64,
    pub relocations_completed: u64,
    pub relocations_backlogged: u64,
    /// Trips that needed more energy than the battery held.
    pub cars_depleted: u64,
    /// Station queue length sampled whenever a car arrives at a station.
    pub station_queue_samples: u64,
    pub station_queue_total: u64,
}

impl MetricCounters {
    pub fn delta_since(&self, earlier: &MetricCounters) -> MetricCounters {
        MetricCounters {
            users_arrived: self.users_arrived - earlier.users_arrived,
            reservation_attempts: self.reservation_attempts - earlier.reservation_attempts,
            reservation_successes: self.reservation_successes - earlier.reservation_successes,
            reservation_failures: self.reservation_failures - earlier.reservation_failures,
            users_abandoned: self.users_abandoned - earlier.users_abandoned,
            attempts_before_success_total: self.attempts_before_success_total
                - earlier.attempts_before_success_total,
            trips_started: self.trips_started - earlier.trips_started,
            trips_completed: self.trips_completed - earlier.trips_completed,
            trip_distance_total: self.trip_distance_total - earlier.trip_distance_total,
            wait_time_ms_total: self.wait_time_ms_total - earlier.wait_time_ms_total,
            walking_time_ms_total: self.walking_time_ms_total - earlier.walking_time_ms_total,
            charging_sessions_started: self.charging_sessions_started
                - earlier.charging_sessions_started,
            charging_sessions_completed: self.charging_sessions_completed
                - earlier.charging_sessions_completed,
            relocations_requested: self.relocations_requested - earlier.relocations_requested,
            relocations_started: self.relocations_started - earlier.relocations_started,
            relocations_completed: self.relocations_completed - earlier.relocations_completed,
            relocations_backlogged: self.relocations_backlogged - earlier.relocations_backlogged,
            cars_depleted: self.cars_depleted - earlier.cars_depleted,
            station_queue_samples: self.station_queue_samples - earlier.station_queue_samples,
            station_queue_total: self.station_queue_total - earlier.station_queue_total,
        }
    }

    /// Successful reservations over all attempts.
    pub fn success_rate(&self) -> Option<f64> {
        ratio(
            self.reservation_successes as f64,
            self.reservation_attempts as f64,
        )
    }

    /// Attempts per successful reservation.
    pub fn average_attempts(&self) -> Option<f64> {
        ratio(
            self.reservation_attempts as f64,
            self.reservation_successes as f64,
        )
    }

    pub fn average_attempts_before_success(&self) -> Option<f64> {
        ratio(
            self.attempts_before_success_total as f64,
            self.reservation_successes as f64,
        )
    }

    pub fn average_trip_distance(&self) -> Option<f64> {
        ratio(self.trip_distance_total, self.trips_completed as f64)
    }

    pub fn average_wait_mins(&self) -> Option<f64> {
        ratio(
            self.wait_time_ms_total as f64 / ONE_MIN_MS as f64,
            self.reservation_successes as f64,
        )
    }

    pub fn average_walking_mins(&self) -> Option<f64> {
        ratio(
            self.walking_time_ms_total as f64 / ONE_MIN_MS as f64,
            self.trips_started as f64,
        )
    }

    pub fn average_queue_length(&self) -> Option<f64> {
        ratio(
            self.station_queue_total as f64,
            self.station_queue_samples as f64,
        )
    }

    pub fn abandonment_rate(&self) -> Option<f64> {
        ratio(self.users_abandoned as f64, self.users_arrived as f64)
    }
}

/// Collects simulation telemetry.
#[derive(Debug, Default, Resource)]
pub struct SimTelemetry {
    pub counters: MetricCounters,
}

/// Fleet-wide time accounting at an instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetUsage {
    pub cars: CarUsage,
    pub station_slot_ms: u64,
    pub relocator_busy_ms: u64,
}

impl FleetUsage {
    /// Sums per-entity time accounting up to `now_ms`, open stints included.
    pub fn at<'a>(
        now_ms: u64,
        cars: impl IntoIterator<Item = &'a Car>,
        stations: impl IntoIterator<Item = &'a ChargingStation>,
        relocators: impl IntoIterator<Item = &'a CarRelocator>,
    ) -> Self {
        let mut usage = FleetUsage::default();
        for car in cars {
            usage.cars.merge(&car.usage_at(now_ms));
        }
        usage.station_slot_ms = stations
            .into_iter()
            .map(|station| station.occupied_slot_ms_at(now_ms))
            .sum();
        usage.relocator_busy_ms = relocators
            .into_iter()
            .map(|relocator| relocator.busy_ms_at(now_ms))
            .sum();
        usage
    }

    pub fn total_car_ms(&self) -> u64 {
        self.cars.total_ms()
    }

    pub fn delta_since(&self, earlier: &FleetUsage) -> FleetUsage {
        FleetUsage {
            cars: self.cars.delta_since(&earlier.cars),
            station_slot_ms: self.station_slot_ms.saturating_sub(earlier.station_slot_ms),
            relocator_busy_ms: self
                .relocator_busy_ms
                .saturating_sub(earlier.relocator_busy_ms),
        }
    }

    /// Share of car time spent driving users around.
    pub fn utilization(&self) -> Option<f64> {
        ratio(self.cars.in_use_ms as f64, self.total_car_ms() as f64)
    }

    pub fn charging_share(&self) -> Option<f64> {
        ratio(self.cars.charging_ms as f64, self.total_car_ms() as f64)
    }

    /// Share of car time parked and available.
    pub fn idle_share(&self) -> Option<f64> {
        ratio(self.cars.available_ms as f64, self.total_car_ms() as f64)
    }

    /// Share of car time reserved, relocating, queued or waiting for a relocator.
    pub fn other_share(&self) -> Option<f64> {
        let other = self.cars.reserved_ms
            + self.cars.relocating_ms
            + self.cars.awaiting_slot_ms
            + self.cars.needs_charging_ms;
        ratio(other as f64, self.total_car_ms() as f64)
    }
}

/// Per-bin derived ratios; `None` where the denominator was zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BinRatios {
    pub success_rate: Option<f64>,
    pub average_attempts: Option<f64>,
    pub utilization: Option<f64>,
    pub charging_share: Option<f64>,
    pub average_trip_distance: Option<f64>,
}

impl BinRatios {
    pub fn from_delta(delta: &MetricCounters, usage: &FleetUsage) -> Self {
        Self {
            success_rate: delta.success_rate(),
            average_attempts: delta.average_attempts(),
            utilization: usage.utilization(),
            charging_share: usage.charging_share(),
            average_trip_distance: delta.average_trip_distance(),
        }
    }
}

/// Immutable snapshot covering `[start_ms, end_ms)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    pub delta: MetricCounters,
    pub usage: FleetUsage,
    pub cumulative: MetricCounters,
    pub cumulative_usage: FleetUsage,
    pub ratios: BinRatios,
}

impl Bin {
    pub fn cumulative_success_rate(&self) -> Option<f64> {
        self.cumulative.success_rate()
    }
}

/// Ordered, append-only bin sequence.
#[derive(Debug, Resource)]
pub struct SimBins {
    interval_ms: u64,
    bins: Vec<Bin>,
    last_counters: MetricCounters,
    last_usage: FleetUsage,
    last_end_ms: u64,
}

impl SimBins {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            bins: Vec::new(),
            last_counters: MetricCounters::default(),
            last_usage: FleetUsage::default(),
            last_end_ms: 0,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Closes the bin ending at `end_ms` from cumulative counters and usage.
    pub fn record(&mut self, end_ms: u64, counters: MetricCounters, usage: FleetUsage) -> &Bin {
        let delta = counters.delta_since(&self.last_counters);
        let usage_delta = usage.delta_since(&self.last_usage);
        let bin = Bin {
            index: self.bins.len(),
            start_ms: self.last_end_ms,
            end_ms,
            delta,
            usage: usage_delta,
            cumulative: counters,
            cumulative_usage: usage,
            ratios: BinRatios::from_delta(&delta, &usage_delta),
        };
        self.last_counters = counters;
        self.last_usage = usage;
        self.last_end_ms = end_ms;
        self.bins.push(bin);
        &self.bins[self.bins.len() - 1]
    }
}

impl Default for SimBins {
    fn default() -> Self {
        Self::new(60 * ONE_MIN_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(attempts: u64, successes: u64, trips: u64, distance: f64) -> MetricCounters {
        MetricCounters {
            reservation_attempts: attempts,
            reservation_successes: successes,
            reservation_failures: attempts - successes,
            trips_completed: trips,
            trip_distance_total: distance,
            ..Default::default()
        }
    }

    #[test]
    fn bins_hold_deltas_and_cumulative_totals() {
        let mut bins = SimBins::new(10);
        bins.record(10, counters(4, 2, 1, 30.0), FleetUsage::default());
        let second = bins.record(20, counters(10, 8, 5, 70.0), FleetUsage::default()).clone();

        assert_eq!(second.index, 1);
        assert_eq!(second.start_ms, 10);
        assert_eq!(second.delta.reservation_attempts, 6);
        assert_eq!(second.delta.reservation_successes, 6);
        assert_eq!(second.ratios.success_rate, Some(1.0));
        assert_eq!(second.ratios.average_trip_distance, Some(10.0));
        assert_eq!(second.cumulative_success_rate(), Some(0.8));
    }

    #[test]
    fn empty_bins_have_undefined_ratios() {
        let mut bins = SimBins::new(10);
        let bin = bins.record(10, MetricCounters::default(), FleetUsage::default());
        assert_eq!(bin.delta.reservation_attempts, 0);
        assert_eq!(bin.ratios, BinRatios::default());
    }

    #[test]
    fn fleet_usage_includes_open_stints() {
        let cars = [Car::new(0, 100.0, 0), Car::new(1, 100.0, 40)];
        let usage = FleetUsage::at(
            100,
            cars.iter(),
            std::iter::empty::<&ChargingStation>(),
            std::iter::empty::<&CarRelocator>(),
        );
        assert_eq!(usage.cars.available_ms, 160);
        assert_eq!(usage.total_car_ms(), 160);
        assert_eq!(usage.idle_share(), Some(1.0));
    }

    #[test]
    fn fleet_shares_come_from_car_time() {
        let usage = FleetUsage {
            cars: CarUsage {
                available_ms: 50,
                in_use_ms: 30,
                charging_ms: 20,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(usage.utilization(), Some(0.3));
        assert_eq!(usage.charging_share(), Some(0.2));
        assert_eq!(usage.idle_share(), Some(0.5));
        assert_eq!(usage.other_share(), Some(0.0));
    }
}
