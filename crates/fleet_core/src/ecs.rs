use bevy_ecs::prelude::{Component, Entity};

use crate::spatial::Location;

/// Current location of a car.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Position(pub Location);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserPhase {
    /// Trying to reserve a car (possibly between retries).
    Searching,
    /// Holds a reservation and is walking to the car.
    Walking,
    /// Driving the reserved car.
    Driving,
}

/// A user for the lifetime of one trip request. Spawned at arrival, despawned
/// after dropoff or after giving up.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct User {
    pub id: u64,
    pub origin: Location,
    pub destination: Location,
    pub phase: UserPhase,
    pub reservation_attempts: u32,
    pub subscribed_at_ms: u64,
    pub first_attempt_at_ms: Option<u64>,
    pub reserved_at_ms: Option<u64>,
    pub picked_up_at_ms: Option<u64>,
    pub car: Option<Entity>,
}

impl User {
    pub fn new(id: u64, origin: Location, destination: Location, now_ms: u64) -> Self {
        Self {
            id,
            origin,
            destination,
            phase: UserPhase::Searching,
            reservation_attempts: 0,
            subscribed_at_ms: now_ms,
            first_attempt_at_ms: None,
            reserved_at_ms: None,
            picked_up_at_ms: None,
            car: None,
        }
    }
}
