use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, UInt64Array};
use arrow::datatypes::Schema;

use crate::telemetry::SimBins;

use super::utils::{f64_field, nullable_f64_field, u64_field, write_record_batch};

/// One row per bin: per-bin deltas, car time split, cumulative reservation
/// totals and the derived ratios (null where undefined).
pub fn write_bins_parquet<P: AsRef<Path>>(
    path: P,
    bins: &SimBins,
) -> Result<(), Box<dyn Error>> {
    let rows = bins.bins();
    let mut bin_index = Vec::with_capacity(rows.len());
    let mut start_ms = Vec::with_capacity(rows.len());
    let mut end_ms = Vec::with_capacity(rows.len());
    let mut users_arrived = Vec::with_capacity(rows.len());
    let mut reservation_attempts = Vec::with_capacity(rows.len());
    let mut reservation_successes = Vec::with_capacity(rows.len());
    let mut users_abandoned = Vec::with_capacity(rows.len());
    let mut trips_completed = Vec::with_capacity(rows.len());
    let mut trip_distance = Vec::with_capacity(rows.len());
    let mut charging_sessions_completed = Vec::with_capacity(rows.len());
    let mut relocations_completed = Vec::with_capacity(rows.len());
    let mut relocations_backlogged = Vec::with_capacity(rows.len());
    let mut car_time_ms = Vec::with_capacity(rows.len());
    let mut in_use_ms = Vec::with_capacity(rows.len());
    let mut charging_ms = Vec::with_capacity(rows.len());
    let mut cumulative_attempts = Vec::with_capacity(rows.len());
    let mut cumulative_successes = Vec::with_capacity(rows.len());
    let mut success_rate = Vec::with_capacity(rows.len());
    let mut average_attempts = Vec::with_capacity(rows.len());
    let mut utilization = Vec::with_capacity(rows.len());
    let mut charging_share = Vec::with_capacity(rows.len());
    let mut average_trip_distance = Vec::with_capacity(rows.len());

    for bin in rows {
        bin_index.push(bin.index as u64);
        start_ms.push(bin.start_ms);
        end_ms.push(bin.end_ms);
        users_arrived.push(bin.delta.users_arrived);
        reservation_attempts.push(bin.delta.reservation_attempts);
        reservation_successes.push(bin.delta.reservation_successes);
        users_abandoned.push(bin.delta.users_abandoned);
        trips_completed.push(bin.delta.trips_completed);
        trip_distance.push(bin.delta.trip_distance_total);
        charging_sessions_completed.push(bin.delta.charging_sessions_completed);
        relocations_completed.push(bin.delta.relocations_completed);
        relocations_backlogged.push(bin.delta.relocations_backlogged);
        car_time_ms.push(bin.usage.total_car_ms());
        in_use_ms.push(bin.usage.cars.in_use_ms);
        charging_ms.push(bin.usage.cars.charging_ms);
        cumulative_attempts.push(bin.cumulative.reservation_attempts);
        cumulative_successes.push(bin.cumulative.reservation_successes);
        success_rate.push(bin.ratios.success_rate);
        average_attempts.push(bin.ratios.average_attempts);
        utilization.push(bin.ratios.utilization);
        charging_share.push(bin.ratios.charging_share);
        average_trip_distance.push(bin.ratios.average_trip_distance);
    }

    let schema = Schema::new(vec![
        u64_field("bin_index"),
        u64_field("start_ms"),
        u64_field("end_ms"),
        u64_field("users_arrived"),
        u64_field("reservation_attempts"),
        u64_field("reservation_successes"),
        u64_field("users_abandoned"),
        u64_field("trips_completed"),
        f64_field("trip_distance"),
        u64_field("charging_sessions_completed"),
        u64_field("relocations_completed"),
        u64_field("relocations_backlogged"),
        u64_field("car_time_ms"),
        u64_field("in_use_ms"),
        u64_field("charging_ms"),
        u64_field("cumulative_attempts"),
        u64_field("cumulative_successes"),
        nullable_f64_field("success_rate"),
        nullable_f64_field("average_attempts"),
        nullable_f64_field("utilization"),
        nullable_f64_field("charging_share"),
        nullable_f64_field("average_trip_distance"),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(bin_index)),
        Arc::new(UInt64Array::from(start_ms)),
        Arc::new(UInt64Array::from(end_ms)),
        Arc::new(UInt64Array::from(users_arrived)),
        Arc::new(UInt64Array::from(reservation_attempts)),
        Arc::new(UInt64Array::from(reservation_successes)),
        Arc::new(UInt64Array::from(users_abandoned)),
        Arc::new(UInt64Array::from(trips_completed)),
        Arc::new(Float64Array::from(trip_distance)),
        Arc::new(UInt64Array::from(charging_sessions_completed)),
        Arc::new(UInt64Array::from(relocations_completed)),
        Arc::new(UInt64Array::from(relocations_backlogged)),
        Arc::new(UInt64Array::from(car_time_ms)),
        Arc::new(UInt64Array::from(in_use_ms)),
        Arc::new(UInt64Array::from(charging_ms)),
        Arc::new(UInt64Array::from(cumulative_attempts)),
        Arc::new(UInt64Array::from(cumulative_successes)),
        Arc::new(Float64Array::from(success_rate)),
        Arc::new(Float64Array::from(average_attempts)),
        Arc::new(Float64Array::from(utilization)),
        Arc::new(Float64Array::from(charging_share)),
        Arc::new(Float64Array::from(average_trip_distance)),
    ];

    write_record_batch(path, schema, arrays)
}
