//! Traffic model: time-of-day travel-time multipliers and rectangular traffic
//! zones.
//!
//! Factors here multiply travel *time*: 1.0 is normal traffic, 2.0 doubles a
//! trip. The model is independent of the distance capability that consumes it.

use serde::{Deserialize, Serialize};

use crate::clock::{ONE_DAY_MS, ONE_MIN_MS};
use crate::spatial::Location;

// ---------------------------------------------------------------------------
// Day periods
// ---------------------------------------------------------------------------

/// The five periods a simulated day is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayPeriod {
    /// 00:00 - 06:00
    EarlyMorning,
    /// 06:00 - 10:00
    MorningRush,
    /// 10:00 - 15:00
    Midday,
    /// 15:00 - 19:00
    EveningRush,
    /// 19:00 - 24:00
    Evening,
}

impl DayPeriod {
    pub const ALL: [DayPeriod; 5] = [
        DayPeriod::EarlyMorning,
        DayPeriod::MorningRush,
        DayPeriod::Midday,
        DayPeriod::EveningRush,
        DayPeriod::Evening,
    ];

    /// Period containing the given simulation time (the run starts at midnight).
    pub fn at(sim_time_ms: u64) -> Self {
        let minute_of_day = (sim_time_ms % ONE_DAY_MS) / ONE_MIN_MS;
        match minute_of_day {
            0..=359 => DayPeriod::EarlyMorning,
            360..=599 => DayPeriod::MorningRush,
            600..=899 => DayPeriod::Midday,
            900..=1139 => DayPeriod::EveningRush,
            _ => DayPeriod::Evening,
        }
    }

    pub fn index(self) -> usize {
        match self {
            DayPeriod::EarlyMorning => 0,
            DayPeriod::MorningRush => 1,
            DayPeriod::Midday => 2,
            DayPeriod::EveningRush => 3,
            DayPeriod::Evening => 4,
        }
    }

    /// Minute of the day at which the period begins.
    pub fn start_minute(self) -> u64 {
        match self {
            DayPeriod::EarlyMorning => 0,
            DayPeriod::MorningRush => 360,
            DayPeriod::Midday => 600,
            DayPeriod::EveningRush => 900,
            DayPeriod::Evening => 1140,
        }
    }

    /// Simulation time at which the period after the one containing
    /// `sim_time_ms` begins.
    pub fn next_start_ms(sim_time_ms: u64) -> u64 {
        let day_start = sim_time_ms - sim_time_ms % ONE_DAY_MS;
        match DayPeriod::ALL.get(DayPeriod::at(sim_time_ms).index() + 1) {
            Some(next) => day_start + next.start_minute() * ONE_MIN_MS,
            None => day_start + ONE_DAY_MS,
        }
    }

    pub fn is_rush_hour(self) -> bool {
        matches!(self, DayPeriod::MorningRush | DayPeriod::EveningRush)
    }
}

// ---------------------------------------------------------------------------
// Traffic profile (time-of-day factors)
// ---------------------------------------------------------------------------

/// Pre-defined traffic profiles.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub enum TrafficProfileKind {
    /// No traffic effects; every factor is 1.0 and zones are ignored.
    #[default]
    None,
    /// Daily pattern with rush-hour slowdowns plus the default traffic zones.
    DailyPeriods,
    /// Custom per-period factors (indexed like [DayPeriod::ALL]) plus the default zones.
    Custom([f64; 5]),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrafficProfile {
    pub period_factors: [f64; 5],
}

impl TrafficProfile {
    pub fn none() -> Self {
        Self {
            period_factors: [1.0; 5],
        }
    }

    /// Light traffic at night, heavy during both rush hours.
    ///
    /// - 00–06: 0.5
    /// - 06–10: 2.0
    /// - 10–15: 1.0
    /// - 15–19: 2.0
    /// - 19–24: 0.7
    pub fn daily_periods() -> Self {
        Self {
            period_factors: [0.5, 2.0, 1.0, 2.0, 0.7],
        }
    }

    pub fn from_kind(kind: &TrafficProfileKind) -> Self {
        match kind {
            TrafficProfileKind::None => Self::none(),
            TrafficProfileKind::DailyPeriods => Self::daily_periods(),
            TrafficProfileKind::Custom(factors) => Self {
                period_factors: *factors,
            },
        }
    }

    pub fn factor_at(&self, sim_time_ms: u64) -> f64 {
        self.period_factors[DayPeriod::at(sim_time_ms).index()]
    }
}

// ---------------------------------------------------------------------------
// Traffic zones
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficZone {
    pub name: String,
    pub min: Location,
    pub max: Location,
    pub base_factor: f64,
    /// Extra multiplier applied during [DayPeriod::is_rush_hour] periods.
    pub rush_hour_factor: f64,
}

impl TrafficZone {
    pub fn contains(&self, location: &Location) -> bool {
        (self.min.x..=self.max.x).contains(&location.x)
            && (self.min.y..=self.max.y).contains(&location.y)
    }
}

/// Ordered zone list; the first zone containing a location wins.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrafficZones {
    pub zones: Vec<TrafficZone>,
}

impl TrafficZones {
    /// Default zones for a 100 x 100 area, scaled to other sizes.
    pub fn city_defaults(width: f64, height: f64) -> Self {
        let sx = width / 100.0;
        let sy = height / 100.0;
        let zone = |name: &str, x1: f64, y1: f64, x2: f64, y2: f64, base: f64, rush: f64| {
            TrafficZone {
                name: name.to_string(),
                min: Location::new(x1 * sx, y1 * sy),
                max: Location::new(x2 * sx, y2 * sy),
                base_factor: base,
                rush_hour_factor: rush,
            }
        };
        Self {
            zones: vec![
                zone("center", 30.0, 30.0, 70.0, 70.0, 2.5, 1.5),
                zone("residential_nw", 0.0, 50.0, 30.0, 100.0, 0.7, 1.2),
                zone("residential_se", 50.0, 0.0, 100.0, 50.0, 0.7, 1.2),
                zone("commercial", 20.0, 20.0, 80.0, 80.0, 1.8, 1.3),
                zone("industrial", 0.0, 0.0, 20.0, 20.0, 0.5, 1.4),
            ],
        }
    }

    pub fn zone_at(&self, location: &Location) -> Option<&TrafficZone> {
        self.zones.iter().find(|zone| zone.contains(location))
    }

    /// Zone factor for a location in a period; 1.0 outside every zone.
    pub fn factor_at(&self, location: &Location, period: DayPeriod) -> f64 {
        match self.zone_at(location) {
            Some(zone) if period.is_rush_hour() => zone.base_factor * zone.rush_hour_factor,
            Some(zone) => zone.base_factor,
            None => 1.0,
        }
    }
}
