//! Car state machine.
//!
//! ```text
//! Available --reserve--> Reserved --start_trip--> InUse --finish_trip--> Available
//!                                                                   \--> NeedsCharging
//! NeedsCharging --begin_relocation--> Relocating --start_charging--> Charging
//!                                                \--await_slot--> AwaitingSlot --start_charging--> Charging
//! Charging --finish_charging--> Available
//! ```
//!
//! State and battery are private so every change goes through a checked
//! transition. Time spent in each state is accumulated for utilization metrics.

use bevy_ecs::prelude::{Component, Entity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_BATTERY: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarState {
    Available,
    Reserved,
    InUse,
    NeedsCharging,
    Relocating,
    /// Parked at a full station, waiting in its queue.
    AwaitingSlot,
    Charging,
}

impl CarState {
    pub const ALL: [CarState; 7] = [
        CarState::Available,
        CarState::Reserved,
        CarState::InUse,
        CarState::NeedsCharging,
        CarState::Relocating,
        CarState::AwaitingSlot,
        CarState::Charging,
    ];
}

/// Milliseconds a car (or the fleet) has spent in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CarUsage {
    pub available_ms: u64,
    pub reserved_ms: u64,
    pub in_use_ms: u64,
    pub needs_charging_ms: u64,
    pub relocating_ms: u64,
    pub awaiting_slot_ms: u64,
    pub charging_ms: u64,
}

impl CarUsage {
    pub fn add(&mut self, state: CarState, ms: u64) {
        let slot = match state {
            CarState::Available => &mut self.available_ms,
            CarState::Reserved => &mut self.reserved_ms,
            CarState::InUse => &mut self.in_use_ms,
            CarState::NeedsCharging => &mut self.needs_charging_ms,
            CarState::Relocating => &mut self.relocating_ms,
            CarState::AwaitingSlot => &mut self.awaiting_slot_ms,
            CarState::Charging => &mut self.charging_ms,
        };
        *slot = slot.saturating_add(ms);
    }

    pub fn total_ms(&self) -> u64 {
        self.available_ms
            + self.reserved_ms
            + self.in_use_ms
            + self.needs_charging_ms
            + self.relocating_ms
            + self.awaiting_slot_ms
            + self.charging_ms
    }

    pub fn merge(&mut self, other: &CarUsage) {
        self.available_ms += other.available_ms;
        self.reserved_ms += other.reserved_ms;
        self.in_use_ms += other.in_use_ms;
        self.needs_charging_ms += other.needs_charging_ms;
        self.relocating_ms += other.relocating_ms;
        self.awaiting_slot_ms += other.awaiting_slot_ms;
        self.charging_ms += other.charging_ms;
    }

    pub fn delta_since(&self, earlier: &CarUsage) -> CarUsage {
        CarUsage {
            available_ms: self.available_ms.saturating_sub(earlier.available_ms),
            reserved_ms: self.reserved_ms.saturating_sub(earlier.reserved_ms),
            in_use_ms: self.in_use_ms.saturating_sub(earlier.in_use_ms),
            needs_charging_ms: self
                .needs_charging_ms
                .saturating_sub(earlier.needs_charging_ms),
            relocating_ms: self.relocating_ms.saturating_sub(earlier.relocating_ms),
            awaiting_slot_ms: self.awaiting_slot_ms.saturating_sub(earlier.awaiting_slot_ms),
            charging_ms: self.charging_ms.saturating_sub(earlier.charging_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum CarTransitionError {
    #[error("car {car_id}: cannot {action} while {state:?}")]
    InvalidTransition {
        car_id: u32,
        action: &'static str,
        state: CarState,
    },

    #[error("car {car_id} is reserved by {reserved_by:?}, not {requested_by:?}")]
    ReservedByOther {
        car_id: u32,
        reserved_by: Option<Entity>,
        requested_by: Entity,
    },
}

/// Battery bookkeeping returned by [Car::finish_trip].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripOutcome {
    pub consumed: f64,
    pub battery: f64,
    /// The trip wanted more energy than the battery held; battery was clamped at 0.
    pub depleted: bool,
    pub needs_charging: bool,
}

#[derive(Debug, Clone, Component)]
pub struct Car {
    pub id: u32,
    state: CarState,
    battery: f64,
    reserved_by: Option<Entity>,
    odometer: f64,
    usage: CarUsage,
    state_since_ms: u64,
}

impl Car {
    pub fn new(id: u32, battery: f64, now_ms: u64) -> Self {
        Self {
            id,
            state: CarState::Available,
            battery: battery.clamp(0.0, MAX_BATTERY),
            reserved_by: None,
            odometer: 0.0,
            usage: CarUsage::default(),
            state_since_ms: now_ms,
        }
    }

    /// Builds a car already in `state`; used when seeding fixtures.
    pub fn with_state(id: u32, battery: f64, state: CarState, now_ms: u64) -> Self {
        Self {
            state,
            ..Self::new(id, battery, now_ms)
        }
    }

    pub fn state(&self) -> CarState {
        self.state
    }

    pub fn battery(&self) -> f64 {
        self.battery
    }

    pub fn reserved_by(&self) -> Option<Entity> {
        self.reserved_by
    }

    pub fn odometer(&self) -> f64 {
        self.odometer
    }

    /// Accumulated usage including the still-open stint in the current state.
    pub fn usage_at(&self, now_ms: u64) -> CarUsage {
        let mut usage = self.usage;
        usage.add(self.state, now_ms.saturating_sub(self.state_since_ms));
        usage
    }

    pub fn is_reservable(&self, min_battery_level: f64) -> bool {
        self.state == CarState::Available && self.battery > min_battery_level
    }

    /// Minutes to reach a full battery at `charge_rate` percent per minute.
    pub fn charge_duration_mins(&self, charge_rate: f64) -> f64 {
        if charge_rate <= 0.0 {
            return 0.0;
        }
        (MAX_BATTERY - self.battery).max(0.0) / charge_rate
    }

    fn expect_state(
        &self,
        allowed: &[CarState],
        action: &'static str,
    ) -> Result<(), CarTransitionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(CarTransitionError::InvalidTransition {
                car_id: self.id,
                action,
                state: self.state,
            })
        }
    }

    fn enter(&mut self, next: CarState, now_ms: u64) {
        self.usage
            .add(self.state, now_ms.saturating_sub(self.state_since_ms));
        self.state = next;
        self.state_since_ms = now_ms;
    }

    pub fn reserve(&mut self, user: Entity, now_ms: u64) -> Result<(), CarTransitionError> {
        self.expect_state(&[CarState::Available], "reserve")?;
        self.reserved_by = Some(user);
        self.enter(CarState::Reserved, now_ms);
        Ok(())
    }

    pub fn start_trip(&mut self, user: Entity, now_ms: u64) -> Result<(), CarTransitionError> {
        self.expect_state(&[CarState::Reserved], "start a trip")?;
        if self.reserved_by != Some(user) {
            return Err(CarTransitionError::ReservedByOther {
                car_id: self.id,
                reserved_by: self.reserved_by,
                requested_by: user,
            });
        }
        self.enter(CarState::InUse, now_ms);
        Ok(())
    }

    /// Ends a trip of `distance` units. The car becomes [CarState::NeedsCharging]
    /// when the remaining battery is at or below `charging_threshold`.
    pub fn finish_trip(
        &mut self,
        distance: f64,
        energy_per_distance: f64,
        charging_threshold: f64,
        now_ms: u64,
    ) -> Result<TripOutcome, CarTransitionError> {
        self.expect_state(&[CarState::InUse], "finish a trip")?;
        let wanted = distance.max(0.0) * energy_per_distance.max(0.0);
        let depleted = wanted > self.battery;
        let consumed = wanted.min(self.battery);
        self.battery = (self.battery - consumed).clamp(0.0, MAX_BATTERY);
        self.odometer += distance.max(0.0);
        self.reserved_by = None;

        let needs_charging = self.battery <= charging_threshold;
        let next = if needs_charging {
            CarState::NeedsCharging
        } else {
            CarState::Available
        };
        self.enter(next, now_ms);
        Ok(TripOutcome {
            consumed,
            battery: self.battery,
            depleted,
            needs_charging,
        })
    }

    pub fn begin_relocation(&mut self, now_ms: u64) -> Result<(), CarTransitionError> {
        self.expect_state(&[CarState::NeedsCharging], "begin relocation")?;
        self.enter(CarState::Relocating, now_ms);
        Ok(())
    }

    pub fn await_slot(&mut self, now_ms: u64) -> Result<(), CarTransitionError> {
        self.expect_state(&[CarState::Relocating], "queue for a slot")?;
        self.enter(CarState::AwaitingSlot, now_ms);
        Ok(())
    }

    pub fn start_charging(&mut self, now_ms: u64) -> Result<(), CarTransitionError> {
        self.expect_state(
            &[CarState::Relocating, CarState::AwaitingSlot],
            "start charging",
        )?;
        self.enter(CarState::Charging, now_ms);
        Ok(())
    }

    pub fn finish_charging(&mut self, now_ms: u64) -> Result<(), CarTransitionError> {
        self.expect_state(&[CarState::Charging], "finish charging")?;
        self.battery = MAX_BATTERY;
        self.enter(CarState::Available, now_ms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Entity {
        Entity::from_raw(1)
    }

    #[test]
    fn full_trip_cycle_accumulates_usage() {
        let renter = user();
        let mut car = Car::new(1, 100.0, 0);
        car.reserve(renter, 10).unwrap();
        car.start_trip(renter, 30).unwrap();
        let outcome = car.finish_trip(50.0, 0.2, 20.0, 90).unwrap();

        assert_eq!(outcome.consumed, 10.0);
        assert_eq!(car.battery(), 90.0);
        assert!(!outcome.needs_charging);
        assert_eq!(car.state(), CarState::Available);
        assert_eq!(car.reserved_by(), None);
        assert_eq!(car.odometer(), 50.0);

        let usage = car.usage_at(100);
        assert_eq!(usage.available_ms, 20);
        assert_eq!(usage.reserved_ms, 20);
        assert_eq!(usage.in_use_ms, 60);
        assert_eq!(usage.total_ms(), 100);
    }

    #[test]
    fn low_battery_after_trip_needs_charging() {
        let renter = user();
        let mut car = Car::new(1, 30.0, 0);
        car.reserve(renter, 0).unwrap();
        car.start_trip(renter, 0).unwrap();
        let outcome = car.finish_trip(50.0, 0.2, 20.0, 5).unwrap();
        assert!(outcome.needs_charging);
        assert_eq!(car.state(), CarState::NeedsCharging);
        assert!(!car.is_reservable(0.0));
    }

    #[test]
    fn battery_clamps_at_zero() {
        let renter = user();
        let mut car = Car::new(1, 5.0, 0);
        car.reserve(renter, 0).unwrap();
        car.start_trip(renter, 0).unwrap();
        let outcome = car.finish_trip(500.0, 0.2, 20.0, 5).unwrap();
        assert!(outcome.depleted);
        assert_eq!(outcome.consumed, 5.0);
        assert_eq!(car.battery(), 0.0);
    }

    #[test]
    fn charging_path_restores_full_battery() {
        let renter = user();
        let mut car = Car::new(1, 25.0, 0);
        car.reserve(renter, 0).unwrap();
        car.start_trip(renter, 0).unwrap();
        car.finish_trip(50.0, 0.2, 20.0, 0).unwrap();
        assert_eq!(car.battery(), 15.0);
        // 85 points to refill at 0.8 per minute.
        assert_eq!(car.charge_duration_mins(0.8), 106.25);

        car.begin_relocation(1).unwrap();
        car.await_slot(2).unwrap();
        car.start_charging(3).unwrap();
        car.finish_charging(4).unwrap();
        assert_eq!(car.battery(), MAX_BATTERY);
        assert_eq!(car.state(), CarState::Available);
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let renter = user();
        let other = Entity::from_raw(2);
        let mut car = Car::new(7, 100.0, 0);
        assert!(matches!(
            car.start_trip(renter, 0),
            Err(CarTransitionError::InvalidTransition { car_id: 7, .. })
        ));
        assert!(car.finish_charging(0).is_err());
        car.reserve(renter, 0).unwrap();
        assert!(car.reserve(other, 0).is_err());
        assert!(matches!(
            car.start_trip(other, 0),
            Err(CarTransitionError::ReservedByOther { .. })
        ));
        assert_eq!(car.state(), CarState::Reserved);
    }

    #[test]
    fn reservable_requires_battery_above_minimum() {
        assert!(Car::new(1, 21.0, 0).is_reservable(20.0));
        assert!(!Car::new(1, 20.0, 0).is_reservable(20.0));
    }
}
