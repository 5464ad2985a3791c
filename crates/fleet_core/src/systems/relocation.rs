//! Relocation dispatch: a relocator walks to the car and drives it to the
//! nearest station. Requests with no idle relocator wait in the backlog.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut};

use crate::car::{Car, CarState};
use crate::clock::{format_sim_time, CurrentEvent, EventPayload, SimulationClock};
use crate::ecs::Position;
use crate::error::SimulationFault;
use crate::relocator::{acquire_nearest, CarRelocator, RelocationBacklog, RelocationTask};
use crate::routing::DistanceModelResource;
use crate::spatial::Location;
use crate::station::{nearest_station, ChargingStation};
use crate::telemetry::SimTelemetry;

/// Where a relocation goes and how long it takes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelocationPlan {
    pub station: Entity,
    pub station_location: Location,
    /// Relocator to car plus car to station.
    pub travel_time_ms: u64,
}

/// Plans a relocation leaving `now`: the relocator travels to the car, then
/// drives it to the station nearest the car.
pub fn plan_relocation<'a, I>(
    relocator_location: Location,
    car_location: Location,
    stations: I,
    distances: &DistanceModelResource,
    now: u64,
) -> Option<RelocationPlan>
where
    I: IntoIterator<Item = (Entity, &'a ChargingStation)>,
{
    let (station, station_location) = nearest_station(stations, |location| {
        distances.distance(car_location, *location, now)
    })?;
    let to_car = distances.distance_and_time(relocator_location, car_location, now);
    let to_station = distances.distance_and_time(
        car_location,
        station_location,
        now.saturating_add(to_car.travel_time_ms),
    );
    Some(RelocationPlan {
        station,
        station_location,
        travel_time_ms: to_car.travel_time_ms.saturating_add(to_station.travel_time_ms),
    })
}

/// Assigns the task and moves the car into `Relocating`. Returns a description
/// of the violated invariant on failure.
pub(crate) fn dispatch_relocation(
    car_entity: Entity,
    car: &mut Car,
    relocator_entity: Entity,
    relocator: &mut CarRelocator,
    plan: RelocationPlan,
    now: u64,
    clock: &mut SimulationClock,
) -> Result<(), String> {
    relocator
        .assign(RelocationTask {
            car: car_entity,
            station: plan.station,
            assigned_at_ms: now,
        })
        .map_err(|err| err.to_string())?;
    car.begin_relocation(now).map_err(|err| err.to_string())?;
    clock.schedule_in(
        plan.travel_time_ms,
        EventPayload::StationArrival {
            car: car_entity,
            station: plan.station,
            relocator: relocator_entity,
        },
    );
    log::debug!(
        "[{}] relocator {} takes car {} to station ({:.1}, {:.1})",
        format_sim_time(now),
        relocator.id,
        car.id,
        plan.station_location.x,
        plan.station_location.y
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn relocation_request_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    distances: Res<DistanceModelResource>,
    mut telemetry: ResMut<SimTelemetry>,
    mut backlog: ResMut<RelocationBacklog>,
    mut fault: ResMut<SimulationFault>,
    mut cars: Query<(&mut Car, &Position)>,
    mut relocators: Query<(Entity, &mut CarRelocator)>,
    stations: Query<(Entity, &ChargingStation)>,
) {
    let EventPayload::RelocationRequest { car: car_entity } = event.0.payload else {
        return;
    };
    let Ok((mut car, position)) = cars.get_mut(car_entity) else {
        return;
    };
    if car.state() != CarState::NeedsCharging {
        return;
    }
    let now = clock.now();
    let car_location = position.0;

    let relocator_entity = match acquire_nearest(relocators.iter(), |location| {
        distances.distance(*location, car_location, now)
    }) {
        Ok(entity) => entity,
        Err(_) => {
            backlog.push(car_entity);
            telemetry.counters.relocations_backlogged += 1;
            log::warn!(
                "[{}] no idle relocator for car {}; {} cars waiting",
                format_sim_time(now),
                car.id,
                backlog.len()
            );
            return;
        }
    };
    let Ok((_, mut relocator)) = relocators.get_mut(relocator_entity) else {
        return;
    };

    let Some(plan) = plan_relocation(
        relocator.location,
        car_location,
        stations.iter(),
        &distances,
        now,
    ) else {
        fault.record(now, "no charging station to relocate to", format!("car {}", car.id));
        return;
    };

    match dispatch_relocation(
        car_entity,
        &mut car,
        relocator_entity,
        &mut relocator,
        plan,
        now,
        &mut clock,
    ) {
        Ok(()) => telemetry.counters.relocations_started += 1,
        Err(message) => fault.record(now, message, format!("relocation of car {}", car.id)),
    }
}
