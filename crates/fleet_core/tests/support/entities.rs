#![allow(dead_code, unused_imports)]

use bevy_ecs::prelude::{Entity, World};
use fleet_core::car::{Car, CarState};
use fleet_core::clock::{EventPayload, SimulationClock};
use fleet_core::spatial::Location;
use fleet_core::station::ChargingStation;

pub use fleet_core::test_helpers::{
    spawn_car, spawn_car_in_state, spawn_relocator, spawn_station, spawn_user,
};

pub fn at(x: f64, y: f64) -> Location {
    Location::new(x, y)
}

pub fn car(world: &World, entity: Entity) -> &Car {
    world.get::<Car>(entity).expect("car entity should exist")
}

pub fn car_state(world: &World, entity: Entity) -> CarState {
    car(world, entity).state()
}

pub fn station(world: &World, entity: Entity) -> &ChargingStation {
    world
        .get::<ChargingStation>(entity)
        .expect("station entity should exist")
}

/// Schedules `payload` at `at_ms` on the world's clock.
pub fn schedule(world: &mut World, at_ms: u64, payload: EventPayload) {
    world
        .resource_mut::<SimulationClock>()
        .schedule_at(at_ms, payload)
        .expect("event should not be in the past");
}
