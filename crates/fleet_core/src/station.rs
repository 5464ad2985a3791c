//! Charging stations: a fixed number of slots plus a first-come-first-served
//! waiting queue.

use std::collections::VecDeque;

use bevy_ecs::prelude::{Component, Entity};
use thiserror::Error;

use crate::spatial::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRequest {
    /// A slot was free; the car starts charging now.
    Charging,
    /// Every slot is taken; the car waits at `position` (0 = next in line).
    Queued { position: usize },
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum StationError {
    #[error("station {station_id}: car {car:?} is not charging here")]
    NotCharging { station_id: u32, car: Entity },

    #[error("station {station_id}: car {car:?} already holds a slot or queue place")]
    AlreadyPresent { station_id: u32, car: Entity },
}

#[derive(Debug, Clone, Component)]
pub struct ChargingStation {
    pub id: u32,
    pub location: Location,
    capacity: usize,
    charging: Vec<Entity>,
    waiting: VecDeque<Entity>,
    /// Integral of occupied slots over time, in slot-milliseconds.
    occupied_slot_ms: u64,
    last_change_ms: u64,
    sessions_started: u64,
}

impl ChargingStation {
    pub fn new(id: u32, location: Location, capacity: usize) -> Self {
        Self {
            id,
            location,
            capacity,
            charging: Vec::with_capacity(capacity),
            waiting: VecDeque::new(),
            occupied_slot_ms: 0,
            last_change_ms: 0,
            sessions_started: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn occupied_slots(&self) -> usize {
        self.charging.len()
    }

    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn charging_cars(&self) -> &[Entity] {
        &self.charging
    }

    pub fn waiting_cars(&self) -> impl Iterator<Item = &Entity> {
        self.waiting.iter()
    }

    pub fn sessions_started(&self) -> u64 {
        self.sessions_started
    }

    /// Occupied slot-time up to `now_ms`, including the open interval.
    pub fn occupied_slot_ms_at(&self, now_ms: u64) -> u64 {
        self.occupied_slot_ms + self.charging.len() as u64 * now_ms.saturating_sub(self.last_change_ms)
    }

    fn advance(&mut self, now_ms: u64) {
        self.occupied_slot_ms = self.occupied_slot_ms_at(now_ms);
        self.last_change_ms = self.last_change_ms.max(now_ms);
    }

    fn contains(&self, car: Entity) -> bool {
        self.charging.contains(&car) || self.waiting.contains(&car)
    }

    /// Gives `car` a free slot, or appends it to the waiting queue.
    pub fn request_slot(&mut self, car: Entity, now_ms: u64) -> Result<SlotRequest, StationError> {
        if self.contains(car) {
            return Err(StationError::AlreadyPresent {
                station_id: self.id,
                car,
            });
        }
        if self.charging.len() < self.capacity {
            self.advance(now_ms);
            self.charging.push(car);
            self.sessions_started += 1;
            Ok(SlotRequest::Charging)
        } else {
            self.waiting.push_back(car);
            Ok(SlotRequest::Queued {
                position: self.waiting.len() - 1,
            })
        }
    }

    /// Frees `car`'s slot and admits the head of the waiting queue, which is
    /// returned so the caller can start its charge.
    pub fn release_slot(&mut self, car: Entity, now_ms: u64) -> Result<Option<Entity>, StationError> {
        let Some(index) = self.charging.iter().position(|c| *c == car) else {
            return Err(StationError::NotCharging {
                station_id: self.id,
                car,
            });
        };
        self.advance(now_ms);
        self.charging.remove(index);
        let next = self.waiting.pop_front();
        if let Some(next_car) = next {
            self.charging.push(next_car);
            self.sessions_started += 1;
        }
        Ok(next)
    }
}

/// Station with the smallest `distance` to its location; ties go to the lowest id.
pub fn nearest_station<'a, I, F>(stations: I, distance: F) -> Option<(Entity, Location)>
where
    I: IntoIterator<Item = (Entity, &'a ChargingStation)>,
    F: Fn(&Location) -> f64,
{
    stations
        .into_iter()
        .map(|(entity, station)| (entity, station, distance(&station.location)))
        .min_by(|a, b| a.2.total_cmp(&b.2).then_with(|| a.1.id.cmp(&b.1.id)))
        .map(|(entity, station, _)| (entity, station.location))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car(n: u32) -> Entity {
        Entity::from_raw(n)
    }

    #[test]
    fn queue_is_served_first_come_first_served() {
        let mut station = ChargingStation::new(0, Location::new(0.0, 0.0), 1);
        assert_eq!(station.request_slot(car(1), 0), Ok(SlotRequest::Charging));
        assert_eq!(
            station.request_slot(car(2), 5),
            Ok(SlotRequest::Queued { position: 0 })
        );
        assert_eq!(
            station.request_slot(car(3), 6),
            Ok(SlotRequest::Queued { position: 1 })
        );
        assert_eq!(station.occupied_slots(), 1);

        assert_eq!(station.release_slot(car(1), 10), Ok(Some(car(2))));
        assert_eq!(station.charging_cars(), &[car(2)]);
        assert_eq!(station.release_slot(car(2), 20), Ok(Some(car(3))));
        assert_eq!(station.release_slot(car(3), 30), Ok(None));
        assert_eq!(station.occupied_slots(), 0);
        assert_eq!(station.sessions_started(), 3);
        assert_eq!(station.occupied_slot_ms_at(40), 30);
    }

    #[test]
    fn occupancy_never_exceeds_capacity() {
        let mut station = ChargingStation::new(0, Location::new(0.0, 0.0), 2);
        for n in 0..6 {
            station.request_slot(car(n), 0).unwrap();
            assert!(station.occupied_slots() <= station.capacity());
        }
        assert_eq!(station.queue_len(), 4);
    }

    #[test]
    fn releasing_unknown_car_is_an_error() {
        let mut station = ChargingStation::new(3, Location::new(0.0, 0.0), 1);
        station.request_slot(car(1), 0).unwrap();
        station.request_slot(car(2), 0).unwrap();
        assert_eq!(
            station.release_slot(car(2), 1),
            Err(StationError::NotCharging {
                station_id: 3,
                car: car(2)
            })
        );
        assert!(station.request_slot(car(1), 2).is_err());
    }

    #[test]
    fn occupied_slot_time_integrates_over_intervals() {
        let mut station = ChargingStation::new(0, Location::new(0.0, 0.0), 2);
        station.request_slot(car(1), 0).unwrap();
        station.request_slot(car(2), 10).unwrap();
        station.release_slot(car(1), 20).unwrap();
        // 10 ms * 1 slot + 10 ms * 2 slots + 5 ms * 1 slot
        assert_eq!(station.occupied_slot_ms_at(25), 35);
    }

    #[test]
    fn nearest_station_breaks_ties_on_id() {
        let a = ChargingStation::new(1, Location::new(10.0, 0.0), 1);
        let b = ChargingStation::new(0, Location::new(-10.0, 0.0), 1);
        let c = ChargingStation::new(2, Location::new(50.0, 0.0), 1);
        let stations = vec![(car(10), &a), (car(11), &b), (car(12), &c)];
        let origin = Location::new(0.0, 0.0);
        let (entity, location) =
            nearest_station(stations, |l| origin.distance_to(l)).expect("station");
        assert_eq!(entity, car(11));
        assert_eq!(location, Location::new(-10.0, 0.0));
    }
}
