use bevy_ecs::prelude::{Commands, Entity, Query, Res, ResMut};

use crate::car::Car;
use crate::clock::{format_sim_time, CurrentEvent, EventPayload, SimulationClock, ONE_HOUR_MS};
use crate::ecs::{Position, User, UserPhase};
use crate::error::{ResourceUnavailable, SimulationFault};
use crate::routing::DistanceModelResource;
use crate::scenario::OperatingRules;
use crate::spatial::Location;
use crate::telemetry::SimTelemetry;

/// Time to walk `distance` at `speed_per_hour`, rounded to the nearest ms.
pub fn walking_time_ms(distance: f64, speed_per_hour: f64) -> u64 {
    if distance <= 0.0 || speed_per_hour <= 0.0 {
        return 0;
    }
    (distance / speed_per_hour * ONE_HOUR_MS as f64).round() as u64
}

/// Nearest reservable car to `origin` within `max_distance`; ties go to the lowest car id.
pub fn nearest_reservable_car<'a, I, F>(
    cars: I,
    min_battery_level: f64,
    max_distance: Option<f64>,
    distance: F,
) -> Result<(Entity, f64), ResourceUnavailable>
where
    I: IntoIterator<Item = (Entity, &'a Car, &'a Position)>,
    F: Fn(&Location) -> f64,
{
    cars.into_iter()
        .filter(|(_, car, _)| car.is_reservable(min_battery_level))
        .map(|(entity, car, position)| (entity, car.id, distance(&position.0)))
        .filter(|(_, _, d)| max_distance.map_or(true, |max| *d <= max))
        .min_by(|a, b| a.2.total_cmp(&b.2).then_with(|| a.1.cmp(&b.1)))
        .map(|(entity, _, d)| (entity, d))
        .ok_or(ResourceUnavailable::NoCarAvailable)
}

/// One reservation attempt: reserve the nearest car and walk to it, or retry
/// after the backoff until the attempt cap, then give up.
#[allow(clippy::too_many_arguments)]
pub fn reservation_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    rules: Res<OperatingRules>,
    distances: Res<DistanceModelResource>,
    mut telemetry: ResMut<SimTelemetry>,
    mut fault: ResMut<SimulationFault>,
    mut commands: Commands,
    mut users: Query<&mut User>,
    mut cars: Query<(Entity, &mut Car, &Position)>,
) {
    let EventPayload::Reservation { user: user_entity } = event.0.payload else {
        return;
    };
    let Ok(mut user) = users.get_mut(user_entity) else {
        return;
    };
    if user.phase != UserPhase::Searching {
        return;
    }
    let now = clock.now();

    user.reservation_attempts += 1;
    let first_attempt_at = *user.first_attempt_at_ms.get_or_insert(now);
    telemetry.counters.reservation_attempts += 1;

    let origin = user.origin;
    let found = nearest_reservable_car(
        cars.iter(),
        rules.min_battery_level,
        rules.max_walking_distance,
        |location| distances.distance(origin, *location, now),
    );

    let (car_entity, walking_distance) = match found {
        Ok(found) => found,
        Err(_) => {
            telemetry.counters.reservation_failures += 1;
            if user.reservation_attempts >= rules.max_reservation_attempts {
                telemetry.counters.users_abandoned += 1;
                log::warn!(
                    "[{}] user {} gives up after {} attempts: no car available",
                    format_sim_time(now),
                    user.id,
                    user.reservation_attempts
                );
                commands.entity(user_entity).despawn();
            } else {
                log::debug!(
                    "[{}] user {} found no car (attempt {}), retrying",
                    format_sim_time(now),
                    user.id,
                    user.reservation_attempts
                );
                clock.schedule_in(
                    rules.retry_backoff_ms,
                    EventPayload::Reservation { user: user_entity },
                );
            }
            return;
        }
    };

    let Ok((_, mut car, _)) = cars.get_mut(car_entity) else {
        return;
    };
    if let Err(err) = car.reserve(user_entity, now) {
        fault.record(now, err.to_string(), format!("reservation by user {}", user.id));
        return;
    }

    telemetry.counters.reservation_successes += 1;
    telemetry.counters.attempts_before_success_total += u64::from(user.reservation_attempts);
    telemetry.counters.wait_time_ms_total += now.saturating_sub(first_attempt_at);

    user.phase = UserPhase::Walking;
    user.reserved_at_ms = Some(now);
    user.car = Some(car_entity);

    let walk_ms = walking_time_ms(walking_distance, rules.walking_speed_per_hour);
    clock.schedule_in(
        walk_ms,
        EventPayload::Pickup {
            user: user_entity,
            car: car_entity,
        },
    );
    log::debug!(
        "[{}] user {} reserved car {} ({:.1} units away, {} attempts)",
        format_sim_time(now),
        user.id,
        car.id,
        walking_distance,
        user.reservation_attempts
    );
}
