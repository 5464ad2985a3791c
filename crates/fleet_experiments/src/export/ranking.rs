use std::cmp::Ordering;

use crate::metrics::ExperimentResult;
use crate::parameters::ParameterSet;

/// Steady-state success rate when available, otherwise the whole-run rate.
fn score(result: &ExperimentResult) -> Option<f64> {
    result.steady_success_rate.or(result.success_rate)
}

/// Highest score wins; ties go to the higher utilization.
pub(crate) fn find_best_index(results: &[ExperimentResult]) -> Option<usize> {
    results
        .iter()
        .enumerate()
        .filter_map(|(index, result)| score(result).map(|s| (index, s, result.utilization.unwrap_or(0.0))))
        .max_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then(a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
        })
        .map(|(index, _, _)| index)
}

pub(crate) fn find_best_parameters_impl<'a>(
    results: &[ExperimentResult],
    parameter_sets: &'a [ParameterSet],
) -> Option<&'a ParameterSet> {
    let best = results.get(find_best_index(results)?)?;
    parameter_sets
        .iter()
        .find(|set| set.experiment_id == best.experiment_id && set.run_id == best.run_id)
}
