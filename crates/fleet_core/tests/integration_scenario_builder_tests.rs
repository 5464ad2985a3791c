mod support;

use bevy_ecs::prelude::World;
use fleet_core::error::ConfigError;
use fleet_core::registry::capture_fleet_snapshot;
use fleet_core::runner::run_scenario;
use fleet_core::scenario::{build_scenario, ScenarioParams, DEFAULT_STATION_POSITIONS};
use fleet_core::spatial::Location;
use fleet_core::spawner::UserSpawner;

#[test]
fn json_overrides_only_the_given_fields() {
    let params = ScenarioParams::from_json_str(
        r#"{
            "num_cars": 12,
            "num_relocators": 1,
            "arrival_rate_per_min": 0.4,
            "max_users": 50,
            "seed": 17
        }"#,
    )
    .expect("valid json");

    assert_eq!(params.num_cars, 12);
    assert_eq!(params.max_users, Some(50));
    assert_eq!(params.seed, Some(17));
    assert_eq!(params.num_stations, ScenarioParams::default().num_stations);
    assert_eq!(params.charge_rate_per_min, 0.8);

    let text = params.to_json_string().expect("serializes");
    let again = ScenarioParams::from_json_str(&text).expect("round trip");
    assert_eq!(again.num_cars, 12);
}

#[test]
fn malformed_or_invalid_json_is_rejected() {
    assert!(matches!(
        ScenarioParams::from_json_str("{ not json"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        ScenarioParams::from_json_str(r#"{"confidence_level": 1.5}"#),
        Err(ConfigError::OutOfRange {
            field: "confidence_level",
            ..
        })
    ));
}

#[test]
fn default_stations_sit_at_the_fixed_sites() {
    let mut world = World::new();
    build_scenario(&mut world, ScenarioParams::default().with_seed(1)).expect("builds");

    let snapshot = capture_fleet_snapshot(&mut world);
    let sites: Vec<Location> = snapshot.stations.iter().map(|s| s.location).collect();
    let expected: Vec<Location> = DEFAULT_STATION_POSITIONS
        .iter()
        .map(|(x, y)| Location::new(*x, *y))
        .collect();
    assert_eq!(sites, expected);
    assert!(snapshot.stations.iter().all(|s| s.capacity == 2));
    assert!(snapshot.users.is_empty());

    let spawner = world.resource::<UserSpawner>();
    assert_eq!(spawner.spawned_count(), 0);
    assert_eq!(spawner.config.max_count, None);
}

#[test]
fn max_users_caps_arrivals() {
    let outcome = run_scenario(
        ScenarioParams::default()
            .with_seed(8)
            .with_max_users(25)
            .with_arrival_rate_per_min(1.0)
            .with_horizon_mins(24.0 * 60.0),
    )
    .expect("runs");
    assert_eq!(outcome.report.counters.users_arrived, 25);
}
