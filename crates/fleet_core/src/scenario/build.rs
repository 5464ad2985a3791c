use bevy_ecs::prelude::World;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::car::Car;
use crate::clock::SimulationClock;
use crate::distributions::{stream_seed, TimeOfDayInterArrival, LAYOUT_STREAM};
use crate::ecs::Position;
use crate::error::{ConfigError, SimulationFault};
use crate::profiling::DispatchStats;
use crate::relocator::{CarRelocator, RelocationBacklog};
use crate::routing::{build_distance_model, DistanceModelResource};
use crate::scenario::params::{ScenarioParams, SimulationEndTimeMs};
use crate::spatial::Location;
use crate::spawner::{UserSpawner, UserSpawnerConfig};
use crate::station::ChargingStation;
use crate::stats::AnalysisSettings;
use crate::telemetry::{SimBins, SimTelemetry};

/// Station sites: the configured positions first, then uniform random sites.
fn station_locations(params: &ScenarioParams, rng: &mut StdRng) -> Vec<Location> {
    (0..params.num_stations)
        .map(|i| {
            params
                .station_positions
                .get(i)
                .copied()
                .unwrap_or_else(|| params.area.random_location(rng))
        })
        .collect()
}

/// Validates `params`, then inserts every resource the handlers need and
/// spawns the fleet: cars at random positions with the initial battery,
/// stations at their sites, relocators spread over the stations.
pub fn build_scenario(world: &mut World, params: ScenarioParams) -> Result<(), ConfigError> {
    params.validate()?;

    let seed = params.seed.unwrap_or(0);
    let mut layout_rng = StdRng::seed_from_u64(stream_seed(seed, LAYOUT_STREAM, 0));

    world.insert_resource(SimulationClock::default());
    world.insert_resource(SimTelemetry::default());
    world.insert_resource(SimBins::new(params.bin_interval_ms()));
    world.insert_resource(SimulationFault::default());
    world.insert_resource(RelocationBacklog::default());
    world.insert_resource(DispatchStats::default());
    world.insert_resource(SimulationEndTimeMs(params.horizon_ms()));
    world.insert_resource(params.operating_rules());
    world.insert_resource(AnalysisSettings {
        system_type: params.system_type,
        config: params.stats_config(),
    });

    let model = build_distance_model(&params.distance_model, params.area.width, params.area.height);
    world.insert_resource(DistanceModelResource(model));

    world.insert_resource(UserSpawner::new(UserSpawnerConfig {
        inter_arrival_dist: Box::new(TimeOfDayInterArrival::new(
            params.arrival_rate_per_min,
            &params.demand_profile,
            seed,
        )),
        area: params.area,
        max_count: params.max_users,
        seed,
    }));

    let stations = station_locations(&params, &mut layout_rng);
    for (id, location) in stations.iter().enumerate() {
        world.spawn(ChargingStation::new(
            id as u32,
            *location,
            params.station_capacity,
        ));
    }

    for id in 0..params.num_cars {
        let location = params.area.random_location(&mut layout_rng);
        world.spawn((
            Car::new(id as u32, params.initial_battery, 0),
            Position(location),
        ));
    }

    for id in 0..params.num_relocators {
        let location = stations
            .get(id % stations.len().max(1))
            .copied()
            .unwrap_or_else(|| params.area.center());
        world.spawn(CarRelocator::new(id as u32, location));
    }

    log::info!(
        "scenario built: {} cars, {} stations (capacity {}), {} relocators, {:.3} users/min, horizon {} min",
        params.num_cars,
        params.num_stations,
        params.station_capacity,
        params.num_relocators,
        params.arrival_rate_per_min,
        params.horizon_mins
    );
    Ok(())
}
