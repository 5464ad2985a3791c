//! Parallel simulation execution using rayon.
//!
//! Runs are independent: each builds its own world from its parameter set,
//! so nothing is shared between threads.

use fleet_core::runner::run_scenario;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::metrics::{extract_result, ExperimentResult};
use crate::parameters::ParameterSet;

/// Run one parameter set to its horizon and reduce it to a result row.
pub fn run_single_simulation(param_set: &ParameterSet) -> Result<ExperimentResult, String> {
    let outcome = run_scenario(param_set.scenario_params()).map_err(|err| {
        format!(
            "{} run {} (seed {}) failed: {err}",
            param_set.experiment_id, param_set.run_id, param_set.seed
        )
    })?;
    Ok(extract_result(param_set, &outcome.report))
}

/// Run multiple simulations in parallel with a progress bar.
///
/// Failed runs are logged and left out of the results.
pub fn run_parallel_experiments(
    parameter_sets: Vec<ParameterSet>,
    num_threads: Option<usize>,
) -> Vec<ExperimentResult> {
    run_parallel_experiments_with_progress(parameter_sets, num_threads, true)
}

/// Run multiple simulations in parallel with optional progress bar.
///
/// Results keep the order of `parameter_sets`, minus any runs that failed.
/// If the requested thread pool cannot be built, rayon's global pool is used.
pub fn run_parallel_experiments_with_progress(
    parameter_sets: Vec<ParameterSet>,
    num_threads: Option<usize>,
    show_progress: bool,
) -> Vec<ExperimentResult> {
    let total = parameter_sets.len();
    let pb = if show_progress && total > 0 {
        let bar = ProgressBar::new(total as u64);
        match ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        ) {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(err) => log::warn!("progress bar template rejected: {err}"),
        }
        Some(bar)
    } else {
        None
    };

    let run_all = || -> Vec<ExperimentResult> {
        parameter_sets
            .par_iter()
            .filter_map(|param_set| {
                let result = run_single_simulation(param_set);
                if let Some(ref progress_bar) = pb {
                    progress_bar.inc(1);
                }
                match result {
                    Ok(result) => Some(result),
                    Err(err) => {
                        log::error!("{err}");
                        None
                    }
                }
            })
            .collect()
    };

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = num_threads {
        builder = builder.num_threads(threads);
    }
    let results = match builder.build() {
        Ok(pool) => pool.install(run_all),
        Err(err) => {
            log::warn!("falling back to the global thread pool: {err}");
            run_all()
        }
    };

    if let Some(ref progress_bar) = pb {
        progress_bar.finish_with_message("Completed");
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ParameterSpace;
    use fleet_core::scenario::ScenarioParams;

    fn short_day() -> ScenarioParams {
        ScenarioParams::default().with_horizon_mins(24.0 * 60.0)
    }

    #[test]
    fn test_single_simulation() {
        let sets = ParameterSpace::grid()
            .with_base(short_day())
            .num_cars(vec![10])
            .seeds(vec![3])
            .generate();
        let result = run_single_simulation(&sets[0]).expect("runs");

        assert_eq!(result.num_cars, 10);
        assert!(result.users_arrived > 0);
        assert_eq!(result.bin_count, 24);
    }

    #[test]
    fn test_parallel_experiments() {
        let sets = ParameterSpace::grid()
            .with_base(short_day())
            .num_cars(vec![10, 20])
            .num_relocators(vec![1, 2])
            .seeds(vec![1])
            .generate();
        let sequential: Vec<_> = sets
            .iter()
            .map(|set| run_single_simulation(set).expect("runs"))
            .collect();
        let results = run_parallel_experiments_with_progress(sets, Some(2), false);

        assert_eq!(results.len(), 4);
        assert_eq!(results, sequential);
    }
}
