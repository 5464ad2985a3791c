//! Parameter variation framework for exploring the scenario space.
//!
//! A [`ParameterSpace`] holds candidate values per dimension; unset
//! dimensions fall back to the base [`ScenarioParams`]. Every combination is
//! replicated once per seed so that results can be averaged across seeds.

use std::collections::HashSet;

use fleet_core::scenario::ScenarioParams;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One combination of the swept dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ParameterCombination {
    num_cars: usize,
    num_stations: usize,
    station_capacity: usize,
    num_relocators: usize,
    arrival_rate_per_min: f64,
}

/// A single parameter configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    /// Base scenario parameters.
    pub params: ScenarioParams,
    /// Identifies the combination; replicas of one combination share it.
    pub experiment_id: String,
    /// Replica index within the experiment.
    pub run_id: usize,
    /// Seed used for this run.
    pub seed: u64,
}

impl ParameterSet {
    pub fn new(params: ScenarioParams, experiment_id: String, run_id: usize, seed: u64) -> Self {
        Self {
            params,
            experiment_id,
            run_id,
            seed,
        }
    }

    /// The scenario params with this run's seed applied.
    pub fn scenario_params(&self) -> ScenarioParams {
        self.params.clone().with_seed(self.seed)
    }
}

/// Defines a parameter space for exploration.
#[derive(Debug, Clone)]
pub struct ParameterSpace {
    base: ScenarioParams,
    num_cars: Vec<usize>,
    num_stations: Vec<usize>,
    station_capacity: Vec<usize>,
    num_relocators: Vec<usize>,
    arrival_rate_per_min: Vec<f64>,
    seeds: Vec<u64>,
}

impl Default for ParameterSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self {
            base: ScenarioParams::default(),
            num_cars: vec![],
            num_stations: vec![],
            station_capacity: vec![],
            num_relocators: vec![],
            arrival_rate_per_min: vec![],
            seeds: vec![],
        }
    }

    /// Create a new parameter space for grid search.
    pub fn grid() -> Self {
        Self::new()
    }

    pub fn num_cars(mut self, counts: Vec<usize>) -> Self {
        self.num_cars = counts;
        self
    }

    pub fn num_stations(mut self, counts: Vec<usize>) -> Self {
        self.num_stations = counts;
        self
    }

    pub fn station_capacity(mut self, capacities: Vec<usize>) -> Self {
        self.station_capacity = capacities;
        self
    }

    pub fn num_relocators(mut self, counts: Vec<usize>) -> Self {
        self.num_relocators = counts;
        self
    }

    pub fn arrival_rate_per_min(mut self, rates: Vec<f64>) -> Self {
        self.arrival_rate_per_min = rates;
        self
    }

    /// Seeds to replicate every combination with.
    pub fn seeds(mut self, seeds: Vec<u64>) -> Self {
        self.seeds = seeds;
        self
    }

    /// Set base parameters (used as defaults).
    pub fn with_base(mut self, base: ScenarioParams) -> Self {
        self.base = base;
        self
    }

    fn dimension<T: Copy>(values: &[T], fallback: T) -> Vec<T> {
        if values.is_empty() {
            vec![fallback]
        } else {
            values.to_vec()
        }
    }

    fn combinations(&self) -> Vec<ParameterCombination> {
        let cars = Self::dimension(&self.num_cars, self.base.num_cars);
        let stations = Self::dimension(&self.num_stations, self.base.num_stations);
        let capacities = Self::dimension(&self.station_capacity, self.base.station_capacity);
        let relocators = Self::dimension(&self.num_relocators, self.base.num_relocators);
        let rates = Self::dimension(&self.arrival_rate_per_min, self.base.arrival_rate_per_min);

        let mut combos = Vec::new();
        for &num_cars in &cars {
            for &num_stations in &stations {
                for &station_capacity in &capacities {
                    for &num_relocators in &relocators {
                        for &arrival_rate_per_min in &rates {
                            combos.push(ParameterCombination {
                                num_cars,
                                num_stations,
                                station_capacity,
                                num_relocators,
                                arrival_rate_per_min,
                            });
                        }
                    }
                }
            }
        }
        combos
    }

    fn seeds_for(&self, experiment_index: usize) -> Vec<u64> {
        if !self.seeds.is_empty() {
            return self.seeds.clone();
        }
        let seed = self
            .base
            .seed
            .unwrap_or_else(|| (experiment_index as u64).wrapping_mul(0x9e3779b9));
        vec![seed]
    }

    fn apply(&self, combo: ParameterCombination) -> ScenarioParams {
        let mut params = self.base.clone();
        params.num_cars = combo.num_cars;
        params.num_stations = combo.num_stations;
        params.station_capacity = combo.station_capacity;
        params.num_relocators = combo.num_relocators;
        params.arrival_rate_per_min = combo.arrival_rate_per_min;
        params
    }

    fn expand(&self, experiment_index: usize, combo: ParameterCombination) -> Vec<ParameterSet> {
        let params = self.apply(combo);
        self.seeds_for(experiment_index)
            .into_iter()
            .enumerate()
            .map(|(run_id, seed)| {
                ParameterSet::new(
                    params.clone(),
                    format!("exp_{experiment_index}"),
                    run_id,
                    seed,
                )
            })
            .collect()
    }

    /// Generate all parameter sets using grid search (Cartesian product),
    /// replicated once per seed. Combinations that fail validation are skipped.
    pub fn generate(&self) -> Vec<ParameterSet> {
        self.combinations()
            .into_iter()
            .filter(|combo| self.is_valid(*combo))
            .enumerate()
            .flat_map(|(index, combo)| self.expand(index, combo))
            .collect()
    }

    /// Samples `count` distinct combinations uniformly from the grid.
    /// Returns fewer when the grid has fewer valid combinations.
    pub fn sample_random(&self, count: usize, seed: u64) -> Vec<ParameterSet> {
        let combos: Vec<ParameterCombination> = self
            .combinations()
            .into_iter()
            .filter(|combo| self.is_valid(*combo))
            .collect();
        if combos.is_empty() {
            return Vec::new();
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut seen = HashSet::new();
        let mut picked = Vec::new();
        while picked.len() < count.min(combos.len()) {
            let index = rng.gen_range(0..combos.len());
            if seen.insert(index) {
                picked.push(index);
            }
        }

        picked
            .into_iter()
            .enumerate()
            .flat_map(|(experiment_index, combo_index)| {
                self.expand(experiment_index, combos[combo_index])
            })
            .collect()
    }

    fn is_valid(&self, combo: ParameterCombination) -> bool {
        match self.apply(combo).validate() {
            Ok(()) => true,
            Err(err) => {
                log::warn!("skipping parameter combination {combo:?}: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_search_single_parameter() {
        let sets = ParameterSpace::grid().num_cars(vec![10, 20, 30]).generate();
        assert_eq!(sets.len(), 3);
        assert_eq!(sets[2].params.num_cars, 30);
    }

    #[test]
    fn test_grid_search_multiple_parameters() {
        let sets = ParameterSpace::grid()
            .num_cars(vec![10, 20])
            .num_relocators(vec![0, 2])
            .arrival_rate_per_min(vec![0.1, 0.2])
            .generate();
        assert_eq!(sets.len(), 8);
        let ids: HashSet<_> = sets.iter().map(|s| s.experiment_id.clone()).collect();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn test_seeds_replicate_each_combination() {
        let sets = ParameterSpace::grid()
            .num_cars(vec![10, 20])
            .seeds(vec![7, 8, 9])
            .generate();
        assert_eq!(sets.len(), 6);
        let first: Vec<_> = sets.iter().filter(|s| s.experiment_id == "exp_0").collect();
        assert_eq!(first.len(), 3);
        assert_eq!(
            first.iter().map(|s| (s.run_id, s.seed)).collect::<Vec<_>>(),
            vec![(0, 7), (1, 8), (2, 9)]
        );
        assert_eq!(first[1].scenario_params().seed, Some(8));
    }

    #[test]
    fn test_unset_dimensions_use_base() {
        let base = ScenarioParams::default().with_stations(3, 6).with_seed(5);
        let sets = ParameterSpace::grid().with_base(base).generate();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].params.num_stations, 3);
        assert_eq!(sets[0].params.station_capacity, 6);
        assert_eq!(sets[0].seed, 5);
    }

    #[test]
    fn test_invalid_combinations_are_skipped() {
        let sets = ParameterSpace::grid()
            .arrival_rate_per_min(vec![0.1, -1.0])
            .generate();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].params.arrival_rate_per_min, 0.1);
    }

    #[test]
    fn test_random_sampling() {
        let space = ParameterSpace::grid()
            .num_cars(vec![10, 20, 30, 40])
            .num_relocators(vec![1, 2, 3]);
        let sets = space.sample_random(5, 42);
        assert_eq!(sets.len(), 5);
        let distinct: HashSet<_> = sets
            .iter()
            .map(|s| (s.params.num_cars, s.params.num_relocators))
            .collect();
        assert_eq!(distinct.len(), 5);

        let again = space.sample_random(5, 42);
        assert_eq!(
            sets.iter().map(|s| s.params.num_cars).collect::<Vec<_>>(),
            again.iter().map(|s| s.params.num_cars).collect::<Vec<_>>()
        );
        assert_eq!(space.sample_random(50, 1).len(), 12);
    }
}
