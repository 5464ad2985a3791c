use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::metrics::ExperimentResult;

pub(crate) fn export_to_parquet_impl(
    results: &[ExperimentResult],
    file: std::fs::File,
) -> Result<(), Box<dyn std::error::Error>> {
    let batch = build_record_batch(results)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

type Column = (Field, ArrayRef);

fn u64_column(name: &str, results: &[ExperimentResult], value: impl Fn(&ExperimentResult) -> u64) -> Column {
    (
        Field::new(name, DataType::UInt64, false),
        Arc::new(UInt64Array::from(results.iter().map(value).collect::<Vec<_>>())),
    )
}

fn f64_column(name: &str, results: &[ExperimentResult], value: impl Fn(&ExperimentResult) -> f64) -> Column {
    (
        Field::new(name, DataType::Float64, false),
        Arc::new(Float64Array::from(results.iter().map(value).collect::<Vec<_>>())),
    )
}

fn nullable_f64_column(
    name: &str,
    results: &[ExperimentResult],
    value: impl Fn(&ExperimentResult) -> Option<f64>,
) -> Column {
    (
        Field::new(name, DataType::Float64, true),
        Arc::new(Float64Array::from(results.iter().map(value).collect::<Vec<_>>())),
    )
}

fn build_record_batch(
    results: &[ExperimentResult],
) -> Result<RecordBatch, arrow::error::ArrowError> {
    let experiment_ids: ArrayRef = Arc::new(StringArray::from(
        results
            .iter()
            .map(|r| r.experiment_id.as_str())
            .collect::<Vec<_>>(),
    ));
    let columns = vec![
        (Field::new("experiment_id", DataType::Utf8, false), experiment_ids),
        u64_column("run_id", results, |r| r.run_id as u64),
        u64_column("seed", results, |r| r.seed),
        u64_column("num_cars", results, |r| r.num_cars as u64),
        u64_column("num_stations", results, |r| r.num_stations as u64),
        u64_column("station_capacity", results, |r| r.station_capacity as u64),
        u64_column("num_relocators", results, |r| r.num_relocators as u64),
        f64_column("arrival_rate_per_min", results, |r| r.arrival_rate_per_min),
        f64_column("horizon_mins", results, |r| r.horizon_mins),
        u64_column("users_arrived", results, |r| r.users_arrived),
        u64_column("reservation_attempts", results, |r| r.reservation_attempts),
        u64_column("reservation_successes", results, |r| r.reservation_successes),
        u64_column("users_abandoned", results, |r| r.users_abandoned),
        u64_column("trips_completed", results, |r| r.trips_completed),
        u64_column("charging_sessions_completed", results, |r| r.charging_sessions_completed),
        u64_column("relocations_completed", results, |r| r.relocations_completed),
        u64_column("stalled_relocations", results, |r| r.stalled_relocations as u64),
        nullable_f64_column("success_rate", results, |r| r.success_rate),
        nullable_f64_column("abandonment_rate", results, |r| r.abandonment_rate),
        nullable_f64_column("average_trip_distance", results, |r| r.average_trip_distance),
        nullable_f64_column("utilization", results, |r| r.utilization),
        nullable_f64_column("charging_rate", results, |r| r.charging_rate),
        nullable_f64_column("idle_rate", results, |r| r.idle_rate),
        u64_column("bin_count", results, |r| r.bin_count as u64),
        nullable_f64_column("steady_success_rate", results, |r| r.steady_success_rate),
        nullable_f64_column("steady_success_rate_lower", results, |r| r.steady_success_rate_lower),
        nullable_f64_column("steady_success_rate_upper", results, |r| r.steady_success_rate_upper),
        nullable_f64_column("steady_success_rate_half_width", results, |r| {
            r.steady_success_rate_half_width
        }),
    ];

    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = columns.into_iter().unzip();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}
