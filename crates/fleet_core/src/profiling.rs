//! Dispatch profiling: how many events of each kind the runner handed to the
//! schedule, and at what wall-clock rate.

use std::collections::HashMap;
use std::time::Instant;

use bevy_ecs::prelude::Resource;

use crate::clock::EventKind;

/// Event dispatch counters.
#[derive(Debug, Default, Resource)]
pub struct DispatchStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Wall-clock start, set on the first recorded event.
    pub start_time: Option<Instant>,
    /// Events per event kind.
    pub events_by_kind: HashMap<EventKind, u64>,
}

impl DispatchStats {
    /// Record an event being dispatched.
    pub fn record_event(&mut self, kind: EventKind) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
        self.events_processed += 1;
        *self.events_by_kind.entry(kind).or_insert(0) += 1;
    }

    pub fn count(&self, kind: EventKind) -> u64 {
        self.events_by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Events per wall-clock second since the first event.
    pub fn events_per_second(&self) -> f64 {
        match self.start_time {
            Some(start) => {
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    self.events_processed as f64 / elapsed
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    /// Per-kind counts sorted by kind, for stable log output.
    pub fn sorted_counts(&self) -> Vec<(EventKind, u64)> {
        let mut counts: Vec<_> = self.events_by_kind.iter().map(|(k, v)| (*k, *v)).collect();
        counts.sort_by_key(|(kind, _)| *kind);
        counts
    }

    pub fn log_summary(&self) {
        log::info!(
            "dispatched {} events ({:.0} events/s)",
            self.events_processed,
            self.events_per_second()
        );
        for (kind, count) in self.sorted_counts() {
            log::debug!("  {:?}: {}", kind, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_events_per_kind() {
        let mut stats = DispatchStats::default();
        stats.record_event(EventKind::Reservation);
        stats.record_event(EventKind::UserArrival);
        stats.record_event(EventKind::Reservation);

        assert_eq!(stats.events_processed, 3);
        assert_eq!(stats.count(EventKind::Reservation), 2);
        assert_eq!(stats.count(EventKind::Dropoff), 0);
        assert_eq!(
            stats.sorted_counts(),
            vec![(EventKind::UserArrival, 1), (EventKind::Reservation, 2)]
        );
        assert!(stats.start_time.is_some());
    }
}
