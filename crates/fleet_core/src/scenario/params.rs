use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::mins_to_ms;
use crate::distributions::DemandProfileKind;
use crate::error::ConfigError;
use crate::routing::DistanceModelKind;
use crate::spatial::{Location, ServiceArea};
use crate::stats::{StatsConfig, SystemType};

/// Default station sites for the 100 x 100 service area.
pub const DEFAULT_STATION_POSITIONS: [(f64, f64); 5] = [
    (20.0, 20.0),
    (80.0, 20.0),
    (20.0, 80.0),
    (80.0, 80.0),
    (50.0, 50.0),
];

/// Simulation end time in milliseconds. The runner stops once the next event
/// would be after this timestamp.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimulationEndTimeMs(pub u64);

/// Operational rules the event handlers consult.
#[derive(Debug, Clone, Copy, Resource)]
pub struct OperatingRules {
    /// A car is reservable only with battery strictly above this level.
    pub min_battery_level: f64,
    /// A car at or below this level after a trip needs charging.
    pub charging_threshold: f64,
    /// Battery percent consumed per distance unit driven.
    pub energy_per_distance: f64,
    /// Battery percent gained per minute at a station.
    pub charge_rate_per_min: f64,
    pub walking_speed_per_hour: f64,
    /// Cars farther than this from the user do not count as available.
    pub max_walking_distance: Option<f64>,
    pub max_reservation_attempts: u32,
    pub retry_backoff_ms: u64,
    pub bin_interval_ms: u64,
}

impl Default for OperatingRules {
    fn default() -> Self {
        let params = ScenarioParams::default();
        params.operating_rules()
    }
}

/// Parameters for building a simulation scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    pub num_cars: usize,
    pub num_stations: usize,
    pub station_capacity: usize,
    /// Explicit station sites, used in order; stations beyond this list are placed randomly.
    pub station_positions: Vec<Location>,
    pub num_relocators: usize,
    /// Base user arrival rate (users per minute) before demand multipliers.
    pub arrival_rate_per_min: f64,
    pub demand_profile: DemandProfileKind,
    /// Stop generating arrivals after this many users. `None` = unbounded.
    pub max_users: Option<u64>,
    pub initial_battery: f64,
    pub min_battery_level: f64,
    pub charging_threshold: f64,
    pub energy_per_distance: f64,
    pub charge_rate_per_min: f64,
    pub walking_speed_per_hour: f64,
    pub max_walking_distance: Option<f64>,
    pub max_reservation_attempts: u32,
    pub retry_backoff_mins: f64,
    pub bin_interval_mins: f64,
    pub confidence_level: f64,
    pub system_type: SystemType,
    /// Cycle length for the cycle-stationary analysis (one day by default).
    pub cycle_length_mins: f64,
    pub distance_model: DistanceModelKind,
    pub area: ServiceArea,
    pub horizon_mins: f64,
    pub seed: Option<u64>,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            num_cars: 20,
            num_stations: 5,
            station_capacity: 2,
            station_positions: DEFAULT_STATION_POSITIONS
                .iter()
                .map(|&p| Location::from(p))
                .collect(),
            num_relocators: 3,
            arrival_rate_per_min: 0.1,
            demand_profile: DemandProfileKind::DailyPeriods,
            max_users: None,
            initial_battery: 100.0,
            min_battery_level: 20.0,
            charging_threshold: 20.0,
            energy_per_distance: 0.2,
            charge_rate_per_min: 0.8,
            walking_speed_per_hour: 50.0,
            max_walking_distance: Some(30.0),
            max_reservation_attempts: 3,
            retry_backoff_mins: 1.0,
            bin_interval_mins: 60.0,
            confidence_level: 0.95,
            system_type: SystemType::Stationary,
            cycle_length_mins: 24.0 * 60.0,
            distance_model: DistanceModelKind::default(),
            area: ServiceArea::default(),
            horizon_mins: 7.0 * 24.0 * 60.0,
            seed: None,
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn within(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

impl ScenarioParams {
    /// Parses and validates parameters from JSON. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let params: ScenarioParams =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Checks every parameter before the run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("num_cars", self.num_cars as f64)?;
        positive("num_stations", self.num_stations as f64)?;
        positive("station_capacity", self.station_capacity as f64)?;
        positive("arrival_rate_per_min", self.arrival_rate_per_min)?;
        within("min_battery_level", self.min_battery_level, 0.0, 100.0)?;
        within("charging_threshold", self.charging_threshold, 0.0, 100.0)?;
        within("initial_battery", self.initial_battery, 0.0, 100.0)?;
        within("energy_per_distance", self.energy_per_distance, 0.0, 100.0)?;
        positive("charge_rate_per_min", self.charge_rate_per_min)?;
        positive("walking_speed_per_hour", self.walking_speed_per_hour)?;
        if let Some(distance) = self.max_walking_distance {
            positive("max_walking_distance", distance)?;
        }
        positive(
            "max_reservation_attempts",
            self.max_reservation_attempts as f64,
        )?;
        within("retry_backoff_mins", self.retry_backoff_mins, 0.0, f64::MAX)?;
        positive("bin_interval_mins", self.bin_interval_mins)?;
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "confidence_level",
                value: self.confidence_level,
                min: 0.0,
                max: 1.0,
            });
        }
        positive("cycle_length_mins", self.cycle_length_mins)?;
        positive("horizon_mins", self.horizon_mins)?;
        positive("area.width", self.area.width)?;
        positive("area.height", self.area.height)?;

        match &self.distance_model {
            DistanceModelKind::Euclidean { speed_per_hour }
            | DistanceModelKind::Traffic { speed_per_hour, .. } => {
                positive("distance_model.speed_per_hour", *speed_per_hour)?;
            }
        }
        if self.demand_profile.multipliers().iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(ConfigError::Inconsistent(
                "demand multipliers must be finite and non-negative".to_string(),
            ));
        }
        if self.charging_threshold < self.min_battery_level {
            return Err(ConfigError::Inconsistent(format!(
                "charging_threshold ({}) must be >= min_battery_level ({})",
                self.charging_threshold, self.min_battery_level
            )));
        }
        if self.initial_battery <= self.charging_threshold {
            return Err(ConfigError::Inconsistent(format!(
                "initial_battery ({}) must be above charging_threshold ({})",
                self.initial_battery, self.charging_threshold
            )));
        }
        if self.system_type == SystemType::CycleStationary
            && self.cycle_length_mins < self.bin_interval_mins
        {
            return Err(ConfigError::Inconsistent(format!(
                "cycle_length_mins ({}) must be >= bin_interval_mins ({})",
                self.cycle_length_mins, self.bin_interval_mins
            )));
        }
        if let Some(position) = self
            .station_positions
            .iter()
            .find(|p| !self.area.contains(p))
        {
            return Err(ConfigError::Inconsistent(format!(
                "station position ({}, {}) lies outside the {} x {} service area",
                position.x, position.y, self.area.width, self.area.height
            )));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_fleet(mut self, num_cars: usize, num_relocators: usize) -> Self {
        self.num_cars = num_cars;
        self.num_relocators = num_relocators;
        self
    }

    /// Set station count and per-station slot capacity.
    pub fn with_stations(mut self, num_stations: usize, capacity: usize) -> Self {
        self.num_stations = num_stations;
        self.station_capacity = capacity;
        self
    }

    pub fn with_station_positions(mut self, positions: Vec<Location>) -> Self {
        self.station_positions = positions;
        self
    }

    pub fn with_arrival_rate_per_min(mut self, rate: f64) -> Self {
        self.arrival_rate_per_min = rate;
        self
    }

    pub fn with_demand_profile(mut self, profile: DemandProfileKind) -> Self {
        self.demand_profile = profile;
        self
    }

    pub fn with_max_users(mut self, max_users: u64) -> Self {
        self.max_users = Some(max_users);
        self
    }

    /// Set both battery thresholds (reservation minimum and charging trigger).
    pub fn with_battery_thresholds(mut self, min_battery_level: f64, charging_threshold: f64) -> Self {
        self.min_battery_level = min_battery_level;
        self.charging_threshold = charging_threshold;
        self
    }

    pub fn with_energy_per_distance(mut self, energy: f64) -> Self {
        self.energy_per_distance = energy;
        self
    }

    pub fn with_charge_rate_per_min(mut self, rate: f64) -> Self {
        self.charge_rate_per_min = rate;
        self
    }

    pub fn with_max_walking_distance(mut self, distance: Option<f64>) -> Self {
        self.max_walking_distance = distance;
        self
    }

    pub fn with_retry_policy(mut self, max_attempts: u32, backoff_mins: f64) -> Self {
        self.max_reservation_attempts = max_attempts;
        self.retry_backoff_mins = backoff_mins;
        self
    }

    pub fn with_bin_interval_mins(mut self, mins: f64) -> Self {
        self.bin_interval_mins = mins;
        self
    }

    pub fn with_system_type(mut self, system_type: SystemType) -> Self {
        self.system_type = system_type;
        self
    }

    pub fn with_cycle_length_mins(mut self, mins: f64) -> Self {
        self.cycle_length_mins = mins;
        self
    }

    pub fn with_confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    pub fn with_distance_model(mut self, kind: DistanceModelKind) -> Self {
        self.distance_model = kind;
        self
    }

    pub fn with_area(mut self, width: f64, height: f64) -> Self {
        self.area = ServiceArea::new(width, height);
        self
    }

    pub fn with_horizon_mins(mut self, mins: f64) -> Self {
        self.horizon_mins = mins;
        self
    }

    pub fn horizon_ms(&self) -> u64 {
        mins_to_ms(self.horizon_mins)
    }

    pub fn bin_interval_ms(&self) -> u64 {
        mins_to_ms(self.bin_interval_mins)
    }

    pub fn operating_rules(&self) -> OperatingRules {
        OperatingRules {
            min_battery_level: self.min_battery_level,
            charging_threshold: self.charging_threshold,
            energy_per_distance: self.energy_per_distance,
            charge_rate_per_min: self.charge_rate_per_min,
            walking_speed_per_hour: self.walking_speed_per_hour,
            max_walking_distance: self.max_walking_distance,
            max_reservation_attempts: self.max_reservation_attempts,
            retry_backoff_ms: mins_to_ms(self.retry_backoff_mins),
            bin_interval_ms: self.bin_interval_ms(),
        }
    }

    pub fn stats_config(&self) -> StatsConfig {
        StatsConfig {
            confidence_level: self.confidence_level,
            bin_interval_ms: self.bin_interval_ms(),
            cycle_length_ms: mins_to_ms(self.cycle_length_mins),
            ..StatsConfig::default()
        }
    }
}
