use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::report::SimulationReport;

/// Writes the full report, analyses included, as pretty-printed JSON.
pub fn write_report_json<P: AsRef<Path>>(
    path: P,
    report: &SimulationReport,
) -> Result<(), Box<dyn Error>> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

/// Writes [SimulationReport::flat_record] as a JSON object.
pub fn write_flat_record_json<P: AsRef<Path>>(
    path: P,
    report: &SimulationReport,
) -> Result<(), Box<dyn Error>> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &report.flat_record())?;
    Ok(())
}
