//! Scenario setup: parameters, validation and world construction.

mod build;
mod params;

pub use build::build_scenario;
pub use params::{OperatingRules, ScenarioParams, SimulationEndTimeMs, DEFAULT_STATION_POSITIONS};
