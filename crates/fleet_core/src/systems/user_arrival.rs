use bevy_ecs::prelude::{Commands, Res, ResMut};

use crate::clock::{format_sim_time, CurrentEvent, EventPayload, SimulationClock};
use crate::ecs::User;
use crate::spawner::UserSpawner;
use crate::telemetry::SimTelemetry;

/// Spawns the arriving user, queues their first reservation attempt at the
/// same instant and schedules the next arrival.
pub fn user_arrival_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut spawner: ResMut<UserSpawner>,
    mut telemetry: ResMut<SimTelemetry>,
    mut commands: Commands,
) {
    if event.0.payload != EventPayload::UserArrival || spawner.exhausted() {
        return;
    }
    let now = clock.now();

    let request = spawner.spawn_next();
    let user = commands
        .spawn(User::new(
            request.user_id,
            request.origin,
            request.destination,
            now,
        ))
        .id();
    telemetry.counters.users_arrived += 1;
    clock.schedule_in(0, EventPayload::Reservation { user });

    if let Some(delay_ms) = spawner.next_delay_ms(now) {
        clock.schedule_in(delay_ms.round() as u64, EventPayload::UserArrival);
    }

    log::debug!(
        "[{}] user {} arrives at ({:.1}, {:.1}) heading to ({:.1}, {:.1})",
        format_sim_time(now),
        request.user_id,
        request.origin.x,
        request.origin.y,
        request.destination.x,
        request.destination.y
    );
}
