//! Event queue and simulation time.
//!
//! Time is an integer count of simulated milliseconds since the start of the
//! run. Configuration is expressed in minutes; use [mins_to_ms] and
//! [ms_to_mins] at the boundary.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::{Entity, Resource};

use crate::error::InvalidScheduleError;

pub const ONE_SEC_MS: u64 = 1000;
pub const ONE_MIN_MS: u64 = 60 * ONE_SEC_MS;
pub const ONE_HOUR_MS: u64 = 60 * ONE_MIN_MS;
pub const ONE_DAY_MS: u64 = 24 * ONE_HOUR_MS;

/// Converts (possibly fractional) minutes to milliseconds, rounding to the nearest ms.
/// Negative and non-finite inputs map to 0.
pub fn mins_to_ms(mins: f64) -> u64 {
    if !mins.is_finite() || mins <= 0.0 {
        return 0;
    }
    (mins * ONE_MIN_MS as f64).round() as u64
}

pub fn ms_to_mins(ms: u64) -> f64 {
    ms as f64 / ONE_MIN_MS as f64
}

/// Renders simulation time as `Day N, HH:MM` for log lines.
pub fn format_sim_time(ms: u64) -> String {
    let day = ms / ONE_DAY_MS;
    let within_day = ms % ONE_DAY_MS;
    let hours = within_day / ONE_HOUR_MS;
    let minutes = (within_day % ONE_HOUR_MS) / ONE_MIN_MS;
    format!("Day {}, {:02}:{:02}", day, hours, minutes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    UserArrival,
    Reservation,
    Pickup,
    Dropoff,
    RelocationRequest,
    StationArrival,
    ChargingComplete,
    BinCollection,
}

/// Typed payload for each event kind. Entities are opaque ids into the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPayload {
    UserArrival,
    Reservation {
        user: Entity,
    },
    Pickup {
        user: Entity,
        car: Entity,
    },
    Dropoff {
        user: Entity,
        car: Entity,
    },
    RelocationRequest {
        car: Entity,
    },
    StationArrival {
        car: Entity,
        station: Entity,
        relocator: Entity,
    },
    ChargingComplete {
        car: Entity,
        station: Entity,
    },
    BinCollection,
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::UserArrival => EventKind::UserArrival,
            EventPayload::Reservation { .. } => EventKind::Reservation,
            EventPayload::Pickup { .. } => EventKind::Pickup,
            EventPayload::Dropoff { .. } => EventKind::Dropoff,
            EventPayload::RelocationRequest { .. } => EventKind::RelocationRequest,
            EventPayload::StationArrival { .. } => EventKind::StationArrival,
            EventPayload::ChargingComplete { .. } => EventKind::ChargingComplete,
            EventPayload::BinCollection => EventKind::BinCollection,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    /// Insertion counter; breaks timestamp ties in FIFO order.
    pub sequence: u64,
    pub payload: EventPayload,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by (timestamp, sequence).
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event currently being handled. Inserted by the runner before each schedule run.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: u64,
    next_sequence: u64,
    events: BinaryHeap<Event>,
}

impl SimulationClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedules `payload` at an absolute timestamp. Scheduling into the past is rejected.
    pub fn schedule_at(
        &mut self,
        timestamp: u64,
        payload: EventPayload,
    ) -> Result<(), InvalidScheduleError> {
        if timestamp < self.now {
            return Err(InvalidScheduleError {
                kind: payload.kind(),
                requested_ms: timestamp,
                now_ms: self.now,
            });
        }
        self.push(timestamp, payload);
        Ok(())
    }

    /// Schedules `payload` `delay_ms` after now. Always valid.
    pub fn schedule_in(&mut self, delay_ms: u64, payload: EventPayload) {
        let timestamp = self.now.saturating_add(delay_ms);
        self.push(timestamp, payload);
    }

    pub fn schedule_in_mins(&mut self, mins: f64, payload: EventPayload) {
        self.schedule_in(mins_to_ms(mins), payload);
    }

    fn push(&mut self, timestamp: u64, payload: EventPayload) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(Event {
            timestamp,
            sequence,
            payload,
        });
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|event| event.timestamp)
    }

    pub fn pending_event_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pops_events_in_time_order() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(10, EventPayload::UserArrival).unwrap();
        clock.schedule_at(5, EventPayload::BinCollection).unwrap();
        clock.schedule_at(20, EventPayload::UserArrival).unwrap();

        let first = clock.pop_next().expect("first event");
        assert_eq!(first.timestamp, 5);
        assert_eq!(clock.now(), 5);

        let second = clock.pop_next().expect("second event");
        assert_eq!(second.timestamp, 10);
        assert_eq!(clock.now(), 10);

        let third = clock.pop_next().expect("third event");
        assert_eq!(third.timestamp, 20);
        assert_eq!(clock.now(), 20);

        assert!(clock.pop_next().is_none());
        assert!(clock.is_empty());
    }

    #[test]
    fn same_time_events_pop_in_insertion_order() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(7, EventPayload::BinCollection).unwrap();
        clock.schedule_at(7, EventPayload::UserArrival).unwrap();
        clock.schedule_at(7, EventPayload::BinCollection).unwrap();

        let kinds: Vec<EventKind> = std::iter::from_fn(|| clock.pop_next())
            .map(|event| event.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::BinCollection,
                EventKind::UserArrival,
                EventKind::BinCollection
            ]
        );
    }

    #[test]
    fn scheduling_in_the_past_is_rejected() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(100, EventPayload::UserArrival).unwrap();
        clock.pop_next();

        let err = clock
            .schedule_at(99, EventPayload::BinCollection)
            .expect_err("past timestamp");
        assert_eq!(err.requested_ms, 99);
        assert_eq!(err.now_ms, 100);
        assert_eq!(err.kind, EventKind::BinCollection);
        assert!(clock.is_empty());

        clock.schedule_at(100, EventPayload::BinCollection).unwrap();
        assert_eq!(clock.pending_event_count(), 1);
    }

    #[test]
    fn minute_conversions_round_to_nearest_ms() {
        assert_eq!(mins_to_ms(1.0), ONE_MIN_MS);
        assert_eq!(mins_to_ms(0.5), 30_000);
        assert_eq!(mins_to_ms(-3.0), 0);
        assert_eq!(mins_to_ms(f64::NAN), 0);
        assert_eq!(mins_to_ms(1.0 / 60_000.0 * 0.6), 1);
        assert!((ms_to_mins(90_000) - 1.5).abs() < 1e-12);
        assert_eq!(format_sim_time(ONE_DAY_MS + 90 * ONE_MIN_MS), "Day 1, 01:30");
    }
}
