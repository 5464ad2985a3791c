#![allow(dead_code)]

use bevy_ecs::prelude::World;
use fleet_core::scenario::OperatingRules;
use fleet_core::test_helpers::create_test_world;

/// Builder for hand-placed test worlds; starts from the default operating rules.
#[derive(Debug, Clone)]
pub struct TestWorldBuilder {
    rules: OperatingRules,
}

impl Default for TestWorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self {
            rules: OperatingRules::default(),
        }
    }

    pub fn with_max_walking_distance(mut self, distance: Option<f64>) -> Self {
        self.rules.max_walking_distance = distance;
        self
    }

    pub fn with_retry_policy(mut self, max_attempts: u32, backoff_ms: u64) -> Self {
        self.rules.max_reservation_attempts = max_attempts;
        self.rules.retry_backoff_ms = backoff_ms;
        self
    }

    pub fn with_battery_thresholds(mut self, min_battery_level: f64, charging_threshold: f64) -> Self {
        self.rules.min_battery_level = min_battery_level;
        self.rules.charging_threshold = charging_threshold;
        self
    }

    pub fn with_charge_rate_per_min(mut self, rate: f64) -> Self {
        self.rules.charge_rate_per_min = rate;
        self
    }

    pub fn rules(&self) -> OperatingRules {
        self.rules
    }

    pub fn build(self) -> World {
        create_test_world(self.rules)
    }
}
