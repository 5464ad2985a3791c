//! Test helpers for common test setup and utilities.
//!
//! These build small hand-placed worlds for driving individual handlers; for
//! full scenarios use [crate::scenario::build_scenario].

use bevy_ecs::prelude::{Entity, World};

use crate::car::{Car, CarState};
use crate::clock::SimulationClock;
use crate::ecs::{Position, User};
use crate::error::SimulationFault;
use crate::profiling::DispatchStats;
use crate::relocator::{CarRelocator, RelocationBacklog};
use crate::routing::{DistanceModelResource, EuclideanDistanceModel};
use crate::scenario::OperatingRules;
use crate::spatial::Location;
use crate::station::ChargingStation;
use crate::telemetry::{SimBins, SimTelemetry};

/// One distance unit per simulated minute, so travel times are easy to read.
pub const TEST_SPEED_PER_HOUR: f64 = 60.0;

/// Create a world with every resource the handlers read, a straight-line
/// distance model at [TEST_SPEED_PER_HOUR] and no entities.
pub fn create_test_world(rules: OperatingRules) -> World {
    let mut world = World::new();
    world.insert_resource(SimulationClock::default());
    world.insert_resource(SimTelemetry::default());
    world.insert_resource(SimBins::new(rules.bin_interval_ms));
    world.insert_resource(SimulationFault::default());
    world.insert_resource(RelocationBacklog::default());
    world.insert_resource(DispatchStats::default());
    world.insert_resource(DistanceModelResource(Box::new(EuclideanDistanceModel {
        speed_per_hour: TEST_SPEED_PER_HOUR,
    })));
    world.insert_resource(rules);
    world
}

pub fn spawn_car(world: &mut World, id: u32, battery: f64, at: Location) -> Entity {
    world.spawn((Car::new(id, battery, 0), Position(at))).id()
}

pub fn spawn_car_in_state(
    world: &mut World,
    id: u32,
    battery: f64,
    state: CarState,
    at: Location,
) -> Entity {
    world
        .spawn((Car::with_state(id, battery, state, 0), Position(at)))
        .id()
}

pub fn spawn_station(world: &mut World, id: u32, at: Location, capacity: usize) -> Entity {
    world.spawn(ChargingStation::new(id, at, capacity)).id()
}

pub fn spawn_relocator(world: &mut World, id: u32, at: Location) -> Entity {
    world.spawn(CarRelocator::new(id, at)).id()
}

/// Spawns a user that has arrived at `now_ms` but not yet tried to reserve.
pub fn spawn_user(
    world: &mut World,
    id: u64,
    origin: Location,
    destination: Location,
    now_ms: u64,
) -> Entity {
    world.spawn(User::new(id, origin, destination, now_ms)).id()
}
