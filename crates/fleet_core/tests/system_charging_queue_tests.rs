mod support;

use fleet_core::car::CarState;
use fleet_core::clock::{EventPayload, ONE_MIN_MS};
use fleet_core::telemetry::SimTelemetry;
use support::entities::{
    at, car, car_state, schedule, spawn_car_in_state, spawn_relocator, spawn_station, station,
};
use support::schedule::ScheduleRunner;
use support::world::TestWorldBuilder;

/// One station with a single slot at (50, 0) and two relocators waiting there.
/// Car A sits 10 units away, car B 20 units away; both need charging at t=0.
///
/// With one unit per minute: A arrives after 20 min and charges 100 min
/// (20% -> 100% at 0.8 %/min); B arrives after 40 min and has to queue.
#[test]
fn second_car_waits_for_the_single_slot() {
    let mut world = TestWorldBuilder::new().build();
    let hub = spawn_station(&mut world, 0, at(50.0, 0.0), 1);
    spawn_relocator(&mut world, 0, at(50.0, 0.0));
    spawn_relocator(&mut world, 1, at(50.0, 0.0));
    let car_a = spawn_car_in_state(&mut world, 0, 20.0, CarState::NeedsCharging, at(40.0, 0.0));
    let car_b = spawn_car_in_state(&mut world, 1, 20.0, CarState::NeedsCharging, at(30.0, 0.0));
    schedule(&mut world, 0, EventPayload::RelocationRequest { car: car_a });
    schedule(&mut world, 0, EventPayload::RelocationRequest { car: car_b });

    let mut runner = ScheduleRunner::new();

    runner.run_until(&mut world, 30 * ONE_MIN_MS);
    assert_eq!(car_state(&world, car_a), CarState::Charging);
    assert_eq!(car_state(&world, car_b), CarState::Relocating);

    runner.run_until(&mut world, 60 * ONE_MIN_MS);
    assert_eq!(car_state(&world, car_b), CarState::AwaitingSlot);
    let busy = station(&world, hub);
    assert_eq!(busy.occupied_slots(), 1);
    assert_eq!(busy.queue_len(), 1);
    assert_eq!(busy.charging_cars(), &[car_a]);

    // A finishes at 120 min; B takes the slot at that instant.
    runner.run_until(&mut world, 119 * ONE_MIN_MS);
    assert_eq!(car_state(&world, car_b), CarState::AwaitingSlot);
    runner.run_until(&mut world, 120 * ONE_MIN_MS);
    assert_eq!(car_state(&world, car_a), CarState::Available);
    assert_eq!(car(&world, car_a).battery(), 100.0);
    assert_eq!(car_state(&world, car_b), CarState::Charging);
    assert_eq!(station(&world, hub).charging_cars(), &[car_b]);
    assert_eq!(station(&world, hub).queue_len(), 0);

    runner.run_until(&mut world, 220 * ONE_MIN_MS);
    assert_eq!(car_state(&world, car_b), CarState::Available);
    assert_eq!(station(&world, hub).occupied_slots(), 0);
    assert_eq!(station(&world, hub).sessions_started(), 2);

    let counters = world.resource::<SimTelemetry>().counters;
    assert_eq!(counters.relocations_completed, 2);
    assert_eq!(counters.charging_sessions_started, 2);
    assert_eq!(counters.charging_sessions_completed, 2);
    // Queue sampled on each arrival: 0 for A, 1 for B.
    assert_eq!(counters.station_queue_samples, 2);
    assert_eq!(counters.station_queue_total, 1);
}

#[test]
fn queue_is_released_first_come_first_served() {
    let mut world = TestWorldBuilder::new().build();
    let hub = spawn_station(&mut world, 0, at(50.0, 0.0), 1);
    for id in 0..3 {
        spawn_relocator(&mut world, id, at(50.0, 0.0));
    }
    // Arrival order at the station follows distance: c0, c1, c2.
    let cars: Vec<_> = [45.0, 40.0, 35.0]
        .iter()
        .enumerate()
        .map(|(id, x)| {
            spawn_car_in_state(&mut world, id as u32, 60.0, CarState::NeedsCharging, at(*x, 0.0))
        })
        .collect();
    for car_entity in &cars {
        schedule(&mut world, 0, EventPayload::RelocationRequest { car: *car_entity });
    }

    let mut runner = ScheduleRunner::new();
    runner.run_until(&mut world, 31 * ONE_MIN_MS);
    let waiting: Vec<_> = station(&world, hub).waiting_cars().copied().collect();
    assert_eq!(waiting, vec![cars[1], cars[2]]);

    // 40% at 0.8 %/min = 50 min per charge; c0 done at 60, c1 at 110.
    runner.run_until(&mut world, 60 * ONE_MIN_MS);
    assert_eq!(car_state(&world, cars[1]), CarState::Charging);
    assert_eq!(car_state(&world, cars[2]), CarState::AwaitingSlot);
    runner.run_until(&mut world, 110 * ONE_MIN_MS);
    assert_eq!(car_state(&world, cars[2]), CarState::Charging);
    assert!(station(&world, hub).occupied_slots() <= station(&world, hub).capacity());
}
