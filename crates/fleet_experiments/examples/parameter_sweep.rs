//! Example: fleet size and relocation capacity sweep.
//!
//! Runs every combination of fleet size and relocator count over three
//! seeds, prints the best configuration by steady-state success rate and
//! writes the rows to CSV, JSON and Parquet.
//!
//! Run with: cargo run --release -p fleet_experiments --example parameter_sweep

use fleet_core::scenario::ScenarioParams;
use fleet_experiments::{
    export_to_csv, export_to_json, export_to_parquet, find_best_parameters,
    find_best_result_index, run_parallel_experiments, ParameterSpace,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Starting fleet sizing sweep...");

    let base = ScenarioParams::default()
        .with_arrival_rate_per_min(0.3)
        .with_horizon_mins(3.0 * 24.0 * 60.0);
    let space = ParameterSpace::grid()
        .with_base(base)
        .num_cars(vec![20, 40, 60])
        .num_relocators(vec![0, 2, 4])
        .station_capacity(vec![2, 4])
        .seeds(vec![11, 22, 33]);

    let parameter_sets = space.generate();
    println!("Generated {} runs", parameter_sets.len());

    println!("Running simulations in parallel...");
    let results = run_parallel_experiments(parameter_sets.clone(), None);
    println!("Completed {} simulations", results.len());

    let best_idx = find_best_result_index(&results).ok_or("no run produced a success rate")?;
    let best = &results[best_idx];
    let percent = |value: Option<f64>| {
        value
            .map(|v| format!("{:.1}%", v * 100.0))
            .unwrap_or_else(|| "n/a".to_string())
    };

    println!("\n=== Best Run ({} / run {}) ===", best.experiment_id, best.run_id);
    println!("Success rate: {}", percent(best.success_rate));
    if let (Some(mean), Some(half_width)) =
        (best.steady_success_rate, best.steady_success_rate_half_width)
    {
        println!("Steady-state success rate: {:.3} ± {:.3}", mean, half_width);
    }
    println!("Utilization: {}", percent(best.utilization));
    println!("Charging share: {}", percent(best.charging_rate));
    println!("Abandonment: {}", percent(best.abandonment_rate));
    println!("Stalled relocations: {}", best.stalled_relocations);

    if let Some(best_params) = find_best_parameters(&results, &parameter_sets) {
        println!("\n=== Best Parameters ===");
        println!("Cars: {}", best_params.params.num_cars);
        println!("Relocators: {}", best_params.params.num_relocators);
        println!(
            "Stations: {} x {} slots",
            best_params.params.num_stations, best_params.params.station_capacity
        );
        println!("Seed: {}", best_params.seed);
    }

    println!("\nExporting results...");
    export_to_csv(&results, "fleet_sweep.csv")?;
    export_to_json(&results, "fleet_sweep.json")?;
    export_to_parquet(&results, "fleet_sweep.parquet")?;
    println!("Exported to fleet_sweep.csv, fleet_sweep.json and fleet_sweep.parquet");

    Ok(())
}
