//! Parallel parameter sweeps over car-sharing scenarios.
//!
//! Each run is an independent simulation; runs execute in parallel and are
//! reduced to one flat [`ExperimentResult`] row each.
//!
//! # Quick Start
//!
//! ```no_run
//! use fleet_experiments::{export_to_csv, run_parallel_experiments, ParameterSpace};
//!
//! let space = ParameterSpace::grid()
//!     .num_cars(vec![20, 40])
//!     .num_relocators(vec![0, 2, 4])
//!     .seeds(vec![1, 2, 3]);
//!
//! let parameter_sets = space.generate();
//! let results = run_parallel_experiments(parameter_sets, None);
//! export_to_csv(&results, "sweep.csv").unwrap();
//! ```
//!
//! - [`parameters`]: grid search and random sampling of scenario parameters
//! - [`runner`]: parallel execution using rayon
//! - [`metrics`]: per-run result rows
//! - [`export`]: CSV, JSON and Parquet output plus ranking helpers

pub mod export;
pub mod metrics;
pub mod parameters;
pub mod runner;

pub use export::{
    export_to_csv, export_to_json, export_to_parquet, find_best_parameters,
    find_best_result_index,
};
pub use metrics::ExperimentResult;
pub use parameters::{ParameterSet, ParameterSpace};
pub use runner::{run_parallel_experiments, run_parallel_experiments_with_progress, run_single_simulation};
