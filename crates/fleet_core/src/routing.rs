//! Distance capability: the only way the engine learns how far apart two
//! locations are and how long driving between them takes.
//!
//! The model is stored as a `Box<dyn DistanceModel>` ECS resource, constructed
//! from [DistanceModelKind] during scenario building. A road-network backed
//! model can be plugged in by implementing the trait.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::ONE_MIN_MS;
use crate::spatial::Location;
use crate::traffic::{DayPeriod, TrafficProfile, TrafficProfileKind, TrafficZones};

/// Result of a distance query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Travel {
    pub distance: f64,
    pub travel_time_ms: u64,
}

/// Trait for distance backends. Implementations must be `Send + Sync` so the
/// model can be stored as a shared ECS resource, and deterministic given their
/// inputs.
pub trait DistanceModel: Send + Sync {
    fn distance_and_time(&self, origin: Location, destination: Location, at_ms: u64) -> Travel;
}

/// ECS resource wrapping a boxed distance model.
#[derive(Resource)]
pub struct DistanceModelResource(pub Box<dyn DistanceModel>);

impl DistanceModelResource {
    pub fn distance_and_time(&self, origin: Location, destination: Location, at_ms: u64) -> Travel {
        self.0.distance_and_time(origin, destination, at_ms)
    }

    pub fn distance(&self, origin: Location, destination: Location, at_ms: u64) -> f64 {
        self.0.distance_and_time(origin, destination, at_ms).distance
    }
}

/// Which distance backend to use.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum DistanceModelKind {
    /// Straight-line distance at a constant speed.
    Euclidean { speed_per_hour: f64 },
    /// Straight-line distance; travel time scaled by time-of-day and zone factors.
    Traffic {
        speed_per_hour: f64,
        profile: TrafficProfileKind,
    },
}

impl Default for DistanceModelKind {
    fn default() -> Self {
        DistanceModelKind::Traffic {
            speed_per_hour: DEFAULT_DRIVING_SPEED_PER_HOUR,
            profile: TrafficProfileKind::DailyPeriods,
        }
    }
}

/// 30 km/h with ten simulation units per kilometre.
pub const DEFAULT_DRIVING_SPEED_PER_HOUR: f64 = 300.0;

fn time_ms(distance: f64, speed_per_hour: f64, factor: f64) -> u64 {
    if distance <= 0.0 || speed_per_hour <= 0.0 {
        return 0;
    }
    let minutes = distance / speed_per_hour * 60.0 * factor;
    (minutes * ONE_MIN_MS as f64).round() as u64
}

#[derive(Debug, Clone)]
pub struct EuclideanDistanceModel {
    pub speed_per_hour: f64,
}

impl DistanceModel for EuclideanDistanceModel {
    fn distance_and_time(&self, origin: Location, destination: Location, _at_ms: u64) -> Travel {
        let distance = origin.distance_to(&destination);
        Travel {
            distance,
            travel_time_ms: time_ms(distance, self.speed_per_hour, 1.0),
        }
    }
}

/// Euclidean distance with a traffic-adjusted travel time. The factor is taken
/// at the origin and departure time.
#[derive(Debug, Clone)]
pub struct TrafficDistanceModel {
    pub speed_per_hour: f64,
    pub profile: TrafficProfile,
    pub zones: TrafficZones,
}

impl TrafficDistanceModel {
    pub fn traffic_factor(&self, location: &Location, at_ms: u64) -> f64 {
        let period = DayPeriod::at(at_ms);
        self.profile.factor_at(at_ms) * self.zones.factor_at(location, period)
    }
}

impl DistanceModel for TrafficDistanceModel {
    fn distance_and_time(&self, origin: Location, destination: Location, at_ms: u64) -> Travel {
        let distance = origin.distance_to(&destination);
        let factor = self.traffic_factor(&origin, at_ms);
        Travel {
            distance,
            travel_time_ms: time_ms(distance, self.speed_per_hour, factor),
        }
    }
}

/// Construct a boxed [DistanceModel] from a [DistanceModelKind] descriptor.
pub fn build_distance_model(
    kind: &DistanceModelKind,
    area_width: f64,
    area_height: f64,
) -> Box<dyn DistanceModel> {
    match kind {
        DistanceModelKind::Euclidean { speed_per_hour } => Box::new(EuclideanDistanceModel {
            speed_per_hour: *speed_per_hour,
        }),
        DistanceModelKind::Traffic {
            speed_per_hour,
            profile,
        } => {
            let zones = match profile {
                TrafficProfileKind::None => TrafficZones::default(),
                _ => TrafficZones::city_defaults(area_width, area_height),
            };
            Box::new(TrafficDistanceModel {
                speed_per_hour: *speed_per_hour,
                profile: TrafficProfile::from_kind(profile),
                zones,
            })
        }
    }
}
