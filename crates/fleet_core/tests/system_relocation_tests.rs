mod support;

use fleet_core::car::CarState;
use fleet_core::clock::{EventPayload, ONE_MIN_MS};
use fleet_core::registry::capture_fleet_snapshot;
use fleet_core::relocator::{CarRelocator, RelocationBacklog};
use fleet_core::runner::run_scenario;
use fleet_core::scenario::ScenarioParams;
use fleet_core::telemetry::SimTelemetry;
use support::entities::{at, car_state, schedule, spawn_car_in_state, spawn_relocator, spawn_station};
use support::schedule::ScheduleRunner;
use support::world::TestWorldBuilder;

#[test]
fn busy_relocator_picks_up_backlog_after_arrival() {
    let mut world = TestWorldBuilder::new().build();
    spawn_station(&mut world, 0, at(50.0, 0.0), 4);
    let relocator = spawn_relocator(&mut world, 0, at(50.0, 0.0));
    let first = spawn_car_in_state(&mut world, 0, 15.0, CarState::NeedsCharging, at(40.0, 0.0));
    let second = spawn_car_in_state(&mut world, 1, 15.0, CarState::NeedsCharging, at(20.0, 0.0));
    schedule(&mut world, 0, EventPayload::RelocationRequest { car: first });
    schedule(&mut world, 0, EventPayload::RelocationRequest { car: second });

    let mut runner = ScheduleRunner::new();
    runner.run_until(&mut world, 0);
    assert_eq!(car_state(&world, first), CarState::Relocating);
    assert_eq!(car_state(&world, second), CarState::NeedsCharging);
    assert_eq!(world.resource::<RelocationBacklog>().len(), 1);

    // First delivery lands at 20 min; the relocator heads straight for the
    // backlogged car (30 units) and brings it back (30 units).
    runner.run_until(&mut world, 20 * ONE_MIN_MS);
    assert_eq!(car_state(&world, first), CarState::Charging);
    assert_eq!(car_state(&world, second), CarState::Relocating);
    assert!(world.resource::<RelocationBacklog>().is_empty());
    let task = world
        .get::<CarRelocator>(relocator)
        .and_then(|r| r.task().copied())
        .expect("relocator reassigned");
    assert_eq!(task.car, second);

    runner.run_until(&mut world, 80 * ONE_MIN_MS);
    assert_eq!(car_state(&world, second), CarState::Charging);
    let counters = world.resource::<SimTelemetry>().counters;
    assert_eq!(counters.relocations_backlogged, 1);
    assert_eq!(counters.relocations_started, 2);
    assert_eq!(counters.relocations_completed, 2);
}

#[test]
fn relocator_is_never_double_booked() {
    let mut world = TestWorldBuilder::new().build();
    spawn_station(&mut world, 0, at(50.0, 50.0), 2);
    spawn_relocator(&mut world, 0, at(50.0, 50.0));
    let cars: Vec<_> = (0..4)
        .map(|id| {
            spawn_car_in_state(
                &mut world,
                id,
                10.0,
                CarState::NeedsCharging,
                at(10.0 * id as f64, 0.0),
            )
        })
        .collect();
    for car in &cars {
        schedule(&mut world, 0, EventPayload::RelocationRequest { car: *car });
    }

    let mut runner = ScheduleRunner::new();
    while runner.run_one(&mut world) {
        let snapshot = capture_fleet_snapshot(&mut world);
        let moving = snapshot
            .cars
            .iter()
            .filter(|car| car.state == CarState::Relocating)
            .count();
        let busy = snapshot.relocators.iter().filter(|r| r.busy).count();
        assert!(moving <= 1, "one relocator moves at most one car");
        assert_eq!(moving, busy);
    }

    let counters = world.resource::<SimTelemetry>().counters;
    assert_eq!(counters.relocations_completed, 4);
    assert_eq!(counters.charging_sessions_completed, 4);
}

#[test]
fn zero_relocators_leaves_cars_stalled_without_failing() {
    let params = ScenarioParams::default()
        .with_seed(7)
        .with_fleet(8, 0)
        .with_arrival_rate_per_min(0.5)
        .with_energy_per_distance(2.0)
        .with_horizon_mins(24.0 * 60.0);

    let outcome = run_scenario(params).expect("run completes without relocators");
    let report = &outcome.report;

    assert!(report.counters.trips_completed > 0);
    assert!(report.stalled_relocations > 0, "{report:?}");
    assert_eq!(report.counters.relocations_started, 0);
    assert_eq!(
        report.cars_by_state.needs_charging,
        report.stalled_relocations
    );
    assert_eq!(
        report.flat_record().get("stalled_relocations").copied(),
        Some(report.stalled_relocations as f64)
    );
}
