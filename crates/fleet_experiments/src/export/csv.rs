use crate::metrics::ExperimentResult;

/// One header row from the field names, then one row per result.
/// `None` ratios are written as empty cells.
pub(crate) fn export_to_csv_impl(
    results: &[ExperimentResult],
    file: std::fs::File,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_writer(file);
    for result in results {
        wtr.serialize(result)?;
    }
    wtr.flush()?;
    Ok(())
}
