use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::car::{Car, CarState};
use crate::clock::{format_sim_time, CurrentEvent, EventPayload, SimulationClock};
use crate::ecs::{Position, User, UserPhase};
use crate::error::SimulationFault;
use crate::routing::DistanceModelResource;
use crate::telemetry::SimTelemetry;

/// The user reached the reserved car: start the trip and schedule the dropoff.
/// Stale pickups (car no longer reserved by this user) are ignored.
pub fn pickup_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    distances: Res<DistanceModelResource>,
    mut telemetry: ResMut<SimTelemetry>,
    mut fault: ResMut<SimulationFault>,
    mut users: Query<&mut User>,
    mut cars: Query<(&mut Car, &Position)>,
) {
    let EventPayload::Pickup {
        user: user_entity,
        car: car_entity,
    } = event.0.payload
    else {
        return;
    };
    let Ok(mut user) = users.get_mut(user_entity) else {
        return;
    };
    let Ok((mut car, position)) = cars.get_mut(car_entity) else {
        return;
    };
    let now = clock.now();

    if user.phase != UserPhase::Walking
        || car.state() != CarState::Reserved
        || car.reserved_by() != Some(user_entity)
    {
        log::debug!(
            "[{}] stale pickup for user {} and car {}",
            format_sim_time(now),
            user.id,
            car.id
        );
        return;
    }

    if let Err(err) = car.start_trip(user_entity, now) {
        fault.record(now, err.to_string(), format!("pickup by user {}", user.id));
        return;
    }

    user.phase = UserPhase::Driving;
    user.picked_up_at_ms = Some(now);
    telemetry.counters.trips_started += 1;
    if let Some(reserved_at) = user.reserved_at_ms {
        telemetry.counters.walking_time_ms_total += now.saturating_sub(reserved_at);
    }

    let travel = distances.distance_and_time(position.0, user.destination, now);
    clock.schedule_in(
        travel.travel_time_ms,
        EventPayload::Dropoff {
            user: user_entity,
            car: car_entity,
        },
    );
    log::debug!(
        "[{}] user {} drives car {} for {:.1} units",
        format_sim_time(now),
        user.id,
        car.id,
        travel.distance
    );
}
