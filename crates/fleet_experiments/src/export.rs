//! Result export and ranking utilities.

use std::path::Path;

use crate::metrics::ExperimentResult;
use crate::parameters::ParameterSet;

#[path = "export/csv.rs"]
mod csv;
#[path = "export/json.rs"]
mod json;
#[path = "export/parquet.rs"]
mod parquet;
#[path = "export/ranking.rs"]
mod ranking;
#[path = "export/writer_utils.rs"]
mod writer_utils;

/// Export results to Parquet, one row per run.
///
/// # Errors
///
/// Returns an error if `results` is empty or file creation or Parquet writing fails.
pub fn export_to_parquet(
    results: &[ExperimentResult],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    writer_utils::ensure_not_empty(results)?;
    let file = writer_utils::create_output_file(path)?;
    parquet::export_to_parquet_impl(results, file)
}

/// Export results as a pretty-printed JSON array.
pub fn export_to_json(
    results: &[ExperimentResult],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = writer_utils::create_output_file(path)?;
    json::export_to_json_impl(results, file)
}

/// Export results to CSV with a header row of field names.
///
/// # Errors
///
/// Returns an error if `results` is empty or file creation or CSV writing fails.
pub fn export_to_csv(
    results: &[ExperimentResult],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    writer_utils::ensure_not_empty(results)?;
    let file = writer_utils::create_output_file(path)?;
    csv::export_to_csv_impl(results, file)
}

/// Index of the run with the best steady-state success rate (whole-run rate
/// when no interval could be formed). Runs with neither are never picked.
pub fn find_best_result_index(results: &[ExperimentResult]) -> Option<usize> {
    ranking::find_best_index(results)
}

/// The parameter set behind [find_best_result_index], matched by
/// experiment and run id.
pub fn find_best_parameters<'a>(
    results: &[ExperimentResult],
    parameter_sets: &'a [ParameterSet],
) -> Option<&'a ParameterSet> {
    ranking::find_best_parameters_impl(results, parameter_sets)
}
