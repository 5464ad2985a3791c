use bevy_ecs::prelude::{Entity, Query, Res, ResMut};

use crate::car::{Car, CarState};
use crate::clock::{format_sim_time, CurrentEvent, EventPayload, SimulationClock};
use crate::ecs::Position;
use crate::error::SimulationFault;
use crate::relocator::{CarRelocator, RelocationBacklog};
use crate::routing::DistanceModelResource;
use crate::scenario::OperatingRules;
use crate::station::{ChargingStation, SlotRequest};
use crate::systems::relocation::{dispatch_relocation, plan_relocation};
use crate::telemetry::SimTelemetry;

/// A relocated car reaches its station: it plugs in or joins the queue, and
/// the freed relocator picks up the nearest backlogged car.
#[allow(clippy::too_many_arguments)]
pub fn station_arrival_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    rules: Res<OperatingRules>,
    distances: Res<DistanceModelResource>,
    mut telemetry: ResMut<SimTelemetry>,
    mut backlog: ResMut<RelocationBacklog>,
    mut fault: ResMut<SimulationFault>,
    mut cars: Query<(&mut Car, &mut Position)>,
    mut relocators: Query<&mut CarRelocator>,
    mut stations: Query<(Entity, &mut ChargingStation)>,
) {
    let EventPayload::StationArrival {
        car: car_entity,
        station: station_entity,
        relocator: relocator_entity,
    } = event.0.payload
    else {
        return;
    };
    let now = clock.now();

    let Ok((_, mut station)) = stations.get_mut(station_entity) else {
        fault.record(now, "relocation target station missing", format!("{station_entity:?}"));
        return;
    };
    let station_location = station.location;

    let Ok(mut relocator) = relocators.get_mut(relocator_entity) else {
        return;
    };
    if let Err(err) = relocator.complete(station_location, now) {
        fault.record(now, err.to_string(), format!("arrival at station {}", station.id));
        return;
    }
    telemetry.counters.relocations_completed += 1;
    let relocator_location = relocator.location;

    let Ok((mut car, mut position)) = cars.get_mut(car_entity) else {
        return;
    };
    position.0 = station_location;

    let transition = match station.request_slot(car_entity, now) {
        Ok(SlotRequest::Charging) => {
            let started = car.start_charging(now).map_err(|err| err.to_string());
            if started.is_ok() {
                telemetry.counters.charging_sessions_started += 1;
                clock.schedule_in_mins(
                    car.charge_duration_mins(rules.charge_rate_per_min),
                    EventPayload::ChargingComplete {
                        car: car_entity,
                        station: station_entity,
                    },
                );
                log::debug!(
                    "[{}] car {} charging at station {} (battery {:.1})",
                    format_sim_time(now),
                    car.id,
                    station.id,
                    car.battery()
                );
            }
            started
        }
        Ok(SlotRequest::Queued { position: place }) => {
            log::debug!(
                "[{}] car {} queued at station {} (place {})",
                format_sim_time(now),
                car.id,
                station.id,
                place
            );
            car.await_slot(now).map_err(|err| err.to_string())
        }
        Err(err) => Err(err.to_string()),
    };
    if let Err(message) = transition {
        fault.record(
            now,
            message,
            format!("car {} at station {}", car.id, station.id),
        );
        return;
    }
    telemetry.counters.station_queue_samples += 1;
    telemetry.counters.station_queue_total += station.queue_len() as u64;

    // The freed relocator takes the nearest car still waiting for one.
    let next = backlog.take_nearest(|candidate| {
        cars.get(candidate)
            .ok()
            .filter(|(car, _)| car.state() == CarState::NeedsCharging)
            .map(|(_, position)| distances.distance(relocator_location, position.0, now))
    });
    let Some(next_car) = next else {
        return;
    };
    let Ok((mut car, position)) = cars.get_mut(next_car) else {
        return;
    };
    let Some(plan) = plan_relocation(
        relocator_location,
        position.0,
        stations.iter(),
        &distances,
        now,
    ) else {
        return;
    };
    match dispatch_relocation(
        next_car,
        &mut car,
        relocator_entity,
        &mut relocator,
        plan,
        now,
        &mut clock,
    ) {
        Ok(()) => telemetry.counters.relocations_started += 1,
        Err(message) => fault.record(now, message, format!("backlogged car {}", car.id)),
    }
}
