//! User spawner: generates the arrival stream.
//!
//! The spawner reacts to `UserArrival` events and schedules its own next
//! arrival. Every arrival draws from its own RNG (see [stream_seed]), so the
//! stream is independent of what else happened in the run.

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::distributions::{stream_seed, InterArrivalDistribution, LOCATION_STREAM};
use crate::spatial::{Location, ServiceArea};

#[derive(Debug)]
pub struct UserSpawnerConfig {
    pub inter_arrival_dist: Box<dyn InterArrivalDistribution>,
    /// Origins and destinations are uniform over this area.
    pub area: ServiceArea,
    /// Optional: maximum number of users to spawn. If None, spawns indefinitely.
    pub max_count: Option<u64>,
    pub seed: u64,
}

/// A freshly sampled trip request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripRequest {
    pub user_id: u64,
    pub origin: Location,
    pub destination: Location,
}

#[derive(Debug, Resource)]
pub struct UserSpawner {
    pub config: UserSpawnerConfig,
    spawned_count: u64,
}

impl UserSpawner {
    pub fn new(config: UserSpawnerConfig) -> Self {
        Self {
            config,
            spawned_count: 0,
        }
    }

    pub fn spawned_count(&self) -> u64 {
        self.spawned_count
    }

    pub fn exhausted(&self) -> bool {
        self.config
            .max_count
            .is_some_and(|max| self.spawned_count >= max)
    }

    /// Samples the next user's origin and destination and counts the spawn.
    pub fn spawn_next(&mut self) -> TripRequest {
        let mut rng = StdRng::seed_from_u64(stream_seed(
            self.config.seed,
            LOCATION_STREAM,
            self.spawned_count,
        ));
        let origin = self.config.area.random_location(&mut rng);
        let destination = self.config.area.random_location(&mut rng);
        let request = TripRequest {
            user_id: self.spawned_count,
            origin,
            destination,
        };
        self.spawned_count += 1;
        request
    }

    /// Delay until the next arrival, or `None` when spawning is over or no
    /// period of the day has demand.
    pub fn next_delay_ms(&self, current_time_ms: u64) -> Option<f64> {
        if self.exhausted() {
            return None;
        }
        let delay = self
            .config
            .inter_arrival_dist
            .sample_ms(self.spawned_count, current_time_ms);
        delay.is_finite().then_some(delay.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::ExponentialInterArrival;

    fn spawner(max_count: Option<u64>) -> UserSpawner {
        UserSpawner::new(UserSpawnerConfig {
            inter_arrival_dist: Box::new(ExponentialInterArrival::new(0.5, 11)),
            area: ServiceArea::new(100.0, 50.0),
            max_count,
            seed: 11,
        })
    }

    #[test]
    fn requests_are_reproducible_and_inside_the_area() {
        let mut a = spawner(None);
        let mut b = spawner(None);
        for _ in 0..50 {
            let (ra, rb) = (a.spawn_next(), b.spawn_next());
            assert_eq!(ra, rb);
            assert!(a.config.area.contains(&ra.origin));
            assert!(a.config.area.contains(&ra.destination));
        }
        assert_eq!(a.spawned_count(), 50);
    }

    #[test]
    fn max_count_stops_arrivals() {
        let mut spawner = spawner(Some(2));
        assert!(spawner.next_delay_ms(0).is_some());
        spawner.spawn_next();
        spawner.spawn_next();
        assert!(spawner.exhausted());
        assert_eq!(spawner.next_delay_ms(0), None);
    }
}
