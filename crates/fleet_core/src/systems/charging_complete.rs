use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::car::Car;
use crate::clock::{format_sim_time, CurrentEvent, EventPayload, SimulationClock};
use crate::error::SimulationFault;
use crate::scenario::OperatingRules;
use crate::station::ChargingStation;
use crate::telemetry::SimTelemetry;

/// A charge finished: the car is full and available, its slot goes to the
/// head of the station queue.
pub fn charging_complete_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    rules: Res<OperatingRules>,
    mut telemetry: ResMut<SimTelemetry>,
    mut fault: ResMut<SimulationFault>,
    mut cars: Query<&mut Car>,
    mut stations: Query<&mut ChargingStation>,
) {
    let EventPayload::ChargingComplete {
        car: car_entity,
        station: station_entity,
    } = event.0.payload
    else {
        return;
    };
    let now = clock.now();
    let Ok(mut station) = stations.get_mut(station_entity) else {
        return;
    };

    {
        let Ok(mut car) = cars.get_mut(car_entity) else {
            return;
        };
        if let Err(err) = car.finish_charging(now) {
            fault.record(now, err.to_string(), format!("station {}", station.id));
            return;
        }
        log::debug!(
            "[{}] car {} fully charged at station {}",
            format_sim_time(now),
            car.id,
            station.id
        );
    }
    telemetry.counters.charging_sessions_completed += 1;

    let next = match station.release_slot(car_entity, now) {
        Ok(next) => next,
        Err(err) => {
            fault.record(now, err.to_string(), "charging complete".to_string());
            return;
        }
    };
    let Some(next_car) = next else {
        return;
    };
    let Ok(mut car) = cars.get_mut(next_car) else {
        fault.record(
            now,
            "queued car missing",
            format!("station {}: {next_car:?}", station.id),
        );
        return;
    };
    if let Err(err) = car.start_charging(now) {
        fault.record(now, err.to_string(), format!("queue head at station {}", station.id));
        return;
    }
    telemetry.counters.charging_sessions_started += 1;
    clock.schedule_in_mins(
        car.charge_duration_mins(rules.charge_rate_per_min),
        EventPayload::ChargingComplete {
            car: next_car,
            station: station_entity,
        },
    );
    log::debug!(
        "[{}] car {} leaves the queue and starts charging at station {}",
        format_sim_time(now),
        car.id,
        station.id
    );
}
