//! Read-only views of the entities in a world: cars, users, stations and
//! relocators with their public state, ordered by id.

use bevy_ecs::prelude::{Entity, World};
use serde::{Deserialize, Serialize};

use crate::car::{Car, CarState};
use crate::clock::SimulationClock;
use crate::ecs::{Position, User, UserPhase};
use crate::relocator::CarRelocator;
use crate::spatial::Location;
use crate::station::ChargingStation;

#[derive(Debug, Clone, PartialEq)]
pub struct CarSnapshot {
    pub entity: Entity,
    pub id: u32,
    pub state: CarState,
    pub battery: f64,
    pub location: Option<Location>,
    pub reserved_by: Option<Entity>,
    pub odometer: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserSnapshot {
    pub entity: Entity,
    pub id: u64,
    pub phase: UserPhase,
    pub origin: Location,
    pub destination: Location,
    pub reservation_attempts: u32,
    pub car: Option<Entity>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationSnapshot {
    pub entity: Entity,
    pub id: u32,
    pub location: Location,
    pub capacity: usize,
    pub occupied_slots: usize,
    pub queue_len: usize,
    pub sessions_started: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelocatorSnapshot {
    pub entity: Entity,
    pub id: u32,
    pub location: Location,
    pub busy: bool,
    pub car: Option<Entity>,
    pub tasks_completed: u64,
}

/// Number of cars in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarStateCounts {
    pub available: usize,
    pub reserved: usize,
    pub in_use: usize,
    pub needs_charging: usize,
    pub relocating: usize,
    pub awaiting_slot: usize,
    pub charging: usize,
}

impl CarStateCounts {
    pub fn add(&mut self, state: CarState) {
        match state {
            CarState::Available => self.available += 1,
            CarState::Reserved => self.reserved += 1,
            CarState::InUse => self.in_use += 1,
            CarState::NeedsCharging => self.needs_charging += 1,
            CarState::Relocating => self.relocating += 1,
            CarState::AwaitingSlot => self.awaiting_slot += 1,
            CarState::Charging => self.charging += 1,
        }
    }

    pub fn get(&self, state: CarState) -> usize {
        match state {
            CarState::Available => self.available,
            CarState::Reserved => self.reserved,
            CarState::InUse => self.in_use,
            CarState::NeedsCharging => self.needs_charging,
            CarState::Relocating => self.relocating,
            CarState::AwaitingSlot => self.awaiting_slot,
            CarState::Charging => self.charging,
        }
    }

    pub fn total(&self) -> usize {
        CarState::ALL.iter().map(|state| self.get(*state)).sum()
    }
}

impl<'a> FromIterator<&'a Car> for CarStateCounts {
    fn from_iter<I: IntoIterator<Item = &'a Car>>(cars: I) -> Self {
        let mut counts = CarStateCounts::default();
        for car in cars {
            counts.add(car.state());
        }
        counts
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetSnapshot {
    pub at_ms: u64,
    pub cars: Vec<CarSnapshot>,
    pub users: Vec<UserSnapshot>,
    pub stations: Vec<StationSnapshot>,
    pub relocators: Vec<RelocatorSnapshot>,
}

impl FleetSnapshot {
    pub fn car_state_counts(&self) -> CarStateCounts {
        let mut counts = CarStateCounts::default();
        for car in &self.cars {
            counts.add(car.state);
        }
        counts
    }

    pub fn car(&self, id: u32) -> Option<&CarSnapshot> {
        self.cars.iter().find(|car| car.id == id)
    }

    pub fn station(&self, id: u32) -> Option<&StationSnapshot> {
        self.stations.iter().find(|station| station.id == id)
    }
}

pub fn capture_fleet_snapshot(world: &mut World) -> FleetSnapshot {
    let at_ms = world
        .get_resource::<SimulationClock>()
        .map(|clock| clock.now())
        .unwrap_or(0);

    let mut cars: Vec<CarSnapshot> = world
        .query::<(Entity, &Car, Option<&Position>)>()
        .iter(world)
        .map(|(entity, car, position)| CarSnapshot {
            entity,
            id: car.id,
            state: car.state(),
            battery: car.battery(),
            location: position.map(|p| p.0),
            reserved_by: car.reserved_by(),
            odometer: car.odometer(),
        })
        .collect();
    cars.sort_by_key(|car| car.id);

    let mut users: Vec<UserSnapshot> = world
        .query::<(Entity, &User)>()
        .iter(world)
        .map(|(entity, user)| UserSnapshot {
            entity,
            id: user.id,
            phase: user.phase,
            origin: user.origin,
            destination: user.destination,
            reservation_attempts: user.reservation_attempts,
            car: user.car,
        })
        .collect();
    users.sort_by_key(|user| user.id);

    let mut stations: Vec<StationSnapshot> = world
        .query::<(Entity, &ChargingStation)>()
        .iter(world)
        .map(|(entity, station)| StationSnapshot {
            entity,
            id: station.id,
            location: station.location,
            capacity: station.capacity(),
            occupied_slots: station.occupied_slots(),
            queue_len: station.queue_len(),
            sessions_started: station.sessions_started(),
        })
        .collect();
    stations.sort_by_key(|station| station.id);

    let mut relocators: Vec<RelocatorSnapshot> = world
        .query::<(Entity, &CarRelocator)>()
        .iter(world)
        .map(|(entity, relocator)| RelocatorSnapshot {
            entity,
            id: relocator.id,
            location: relocator.location,
            busy: relocator.is_busy(),
            car: relocator.task().map(|task| task.car),
            tasks_completed: relocator.tasks_completed(),
        })
        .collect();
    relocators.sort_by_key(|relocator| relocator.id);

    FleetSnapshot {
        at_ms,
        cars,
        users,
        stations,
        relocators,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_lists_entities_in_id_order() {
        let mut world = World::new();
        world.insert_resource(SimulationClock::default());
        world.spawn((
            Car::with_state(2, 40.0, CarState::NeedsCharging, 0),
            Position(Location::new(1.0, 1.0)),
        ));
        world.spawn((Car::new(1, 90.0, 0), Position(Location::new(2.0, 2.0))));
        world.spawn(ChargingStation::new(0, Location::new(50.0, 50.0), 3));
        world.spawn(CarRelocator::new(0, Location::new(50.0, 50.0)));
        world.spawn(User::new(
            7,
            Location::new(0.0, 0.0),
            Location::new(9.0, 9.0),
            0,
        ));

        let snapshot = capture_fleet_snapshot(&mut world);
        assert_eq!(snapshot.cars.len(), 2);
        assert_eq!(snapshot.cars[0].id, 1);
        assert_eq!(snapshot.cars[1].state, CarState::NeedsCharging);
        assert_eq!(snapshot.car(1).and_then(|c| c.location), Some(Location::new(2.0, 2.0)));
        assert_eq!(snapshot.users[0].phase, UserPhase::Searching);
        assert_eq!(snapshot.station(0).map(|s| s.capacity), Some(3));
        assert!(!snapshot.relocators[0].busy);

        let counts = snapshot.car_state_counts();
        assert_eq!(counts.available, 1);
        assert_eq!(counts.needs_charging, 1);
        assert_eq!(counts.total(), 2);
    }
}
