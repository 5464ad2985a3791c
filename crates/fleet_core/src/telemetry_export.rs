//! File exports: the bin sequence to Parquet, the end-of-run report to JSON.

mod bins;
mod report;
mod utils;

pub use bins::write_bins_parquet;
pub use report::{write_flat_record_json, write_report_json};
