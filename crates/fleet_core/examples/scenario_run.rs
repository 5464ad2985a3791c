//! Run a one-week car-sharing scenario and print the report.
//!
//! Run with: cargo run -p fleet_core --example scenario_run [output_dir]

use fleet_core::registry::capture_fleet_snapshot;
use fleet_core::runner::run_scenario;
use fleet_core::scenario::ScenarioParams;
use fleet_core::stats::AnalysisOutcome;
use fleet_core::telemetry_export::{write_bins_parquet, write_flat_record_json, write_report_json};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    const NUM_CARS: usize = 40;
    const NUM_RELOCATORS: usize = 4;
    const SIMULATION_DAYS: f64 = 7.0;

    let params = ScenarioParams::default()
        .with_seed(123)
        .with_fleet(NUM_CARS, NUM_RELOCATORS)
        .with_arrival_rate_per_min(0.3)
        .with_horizon_mins(SIMULATION_DAYS * 24.0 * 60.0);

    let mut outcome = run_scenario(params)?;
    let report = &outcome.report;
    let c = &report.counters;
    let percent = |value: Option<f64>| {
        value
            .map(|v| format!("{:.1}%", v * 100.0))
            .unwrap_or_else(|| "n/a".to_string())
    };

    println!(
        "--- Scenario run ({} cars, {} relocators, {} days, seed 123) ---",
        NUM_CARS, NUM_RELOCATORS, SIMULATION_DAYS
    );
    println!("Events processed: {}", outcome.steps);
    println!("Simulation time: {:.1} h", report.end_ms as f64 / 3_600_000.0);
    println!(
        "Users: {} arrived, {} abandoned ({})",
        c.users_arrived,
        c.users_abandoned,
        percent(report.rates.abandonment_rate)
    );
    println!(
        "Reservations: {} attempts, {} successes ({})",
        c.reservation_attempts,
        c.reservation_successes,
        percent(report.rates.success_rate)
    );
    println!(
        "Trips: {} completed, avg distance {:.2}",
        c.trips_completed,
        report.rates.average_trip_distance.unwrap_or(0.0)
    );
    println!(
        "Charging sessions: {} | relocations: {} done, {} stalled",
        c.charging_sessions_completed, c.relocations_completed, report.stalled_relocations
    );
    println!(
        "Fleet time: utilization {}, charging {}, idle {}",
        percent(report.rates.utilization),
        percent(report.rates.charging_rate),
        percent(report.rates.idle_rate)
    );

    println!("\nSteady-state estimates ({} hourly bins):", report.bin_count);
    for analysis in &report.analyses {
        match &analysis.outcome {
            AnalysisOutcome::Stationary { transient, interval } => match interval.interval() {
                Some(ci) => println!(
                    "  {:<24} {:.4} ± {:.4}  (steady from bin {}, {} batches)",
                    analysis.metric.name(),
                    ci.mean,
                    ci.half_width,
                    transient.end_bin_index,
                    ci.num_batches
                ),
                None => println!("  {:<24} not enough batches", analysis.metric.name()),
            },
            AnalysisOutcome::CycleStationary { phases } => {
                println!("  {:<24} {} phases", analysis.metric.name(), phases.len())
            }
            AnalysisOutcome::InsufficientData {
                available,
                required,
            } => println!(
                "  {:<24} insufficient data ({available}/{required} bins)",
                analysis.metric.name()
            ),
        }
    }

    let snapshot = capture_fleet_snapshot(&mut outcome.world);
    println!("\nStations at end of run:");
    for station in &snapshot.stations {
        println!(
            "  station {}  charging {}/{}  queued {}",
            station.id, station.occupied_slots, station.capacity, station.queue_len
        );
    }

    if let Some(dir) = std::env::args().nth(1) {
        let dir = std::path::PathBuf::from(dir);
        std::fs::create_dir_all(&dir)?;
        write_bins_parquet(dir.join("bins.parquet"), outcome.bins())?;
        write_report_json(dir.join("report.json"), &outcome.report)?;
        write_flat_record_json(dir.join("record.json"), &outcome.report)?;
        println!("\nWrote bins.parquet, report.json and record.json to {}", dir.display());
    }

    Ok(())
}
