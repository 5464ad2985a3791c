use bevy_ecs::prelude::{Commands, Query, Res, ResMut};

use crate::car::Car;
use crate::clock::{format_sim_time, CurrentEvent, EventPayload, SimulationClock};
use crate::ecs::{Position, User, UserPhase};
use crate::error::SimulationFault;
use crate::routing::DistanceModelResource;
use crate::scenario::OperatingRules;
use crate::telemetry::SimTelemetry;

/// Ends the trip: the car pays for the distance driven, parks at the
/// destination and either becomes available again or asks for a relocation.
#[allow(clippy::too_many_arguments)]
pub fn dropoff_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    rules: Res<OperatingRules>,
    distances: Res<DistanceModelResource>,
    mut telemetry: ResMut<SimTelemetry>,
    mut fault: ResMut<SimulationFault>,
    mut commands: Commands,
    users: Query<&User>,
    mut cars: Query<(&mut Car, &mut Position)>,
) {
    let EventPayload::Dropoff {
        user: user_entity,
        car: car_entity,
    } = event.0.payload
    else {
        return;
    };
    let Ok(user) = users.get(user_entity) else {
        return;
    };
    if user.phase != UserPhase::Driving {
        return;
    }
    let Ok((mut car, mut position)) = cars.get_mut(car_entity) else {
        return;
    };
    let now = clock.now();

    let departed_at = user.picked_up_at_ms.unwrap_or(now);
    let distance = distances.distance(position.0, user.destination, departed_at);
    let outcome = match car.finish_trip(
        distance,
        rules.energy_per_distance,
        rules.charging_threshold,
        now,
    ) {
        Ok(outcome) => outcome,
        Err(err) => {
            fault.record(now, err.to_string(), format!("dropoff by user {}", user.id));
            return;
        }
    };
    position.0 = user.destination;

    let counters = &mut telemetry.counters;
    counters.trips_completed += 1;
    counters.trip_distance_total += distance;
    if outcome.depleted {
        counters.cars_depleted += 1;
        log::warn!(
            "[{}] car {} ran out of battery on a {:.1} unit trip",
            format_sim_time(now),
            car.id,
            distance
        );
    }
    if outcome.needs_charging {
        counters.relocations_requested += 1;
        clock.schedule_in(0, EventPayload::RelocationRequest { car: car_entity });
    }

    log::debug!(
        "[{}] user {} dropped car {} ({:.1} units, battery {:.1})",
        format_sim_time(now),
        user.id,
        car.id,
        distance,
        outcome.battery
    );
    commands.entity(user_entity).despawn();
}
