use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::car::Car;
use crate::clock::{format_sim_time, CurrentEvent, EventPayload, SimulationClock};
use crate::relocator::CarRelocator;
use crate::station::ChargingStation;
use crate::telemetry::{FleetUsage, SimBins, SimTelemetry};

/// Closes the current bin and schedules the next collection one interval later.
pub fn bin_collection_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    telemetry: Res<SimTelemetry>,
    mut bins: ResMut<SimBins>,
    cars: Query<&Car>,
    stations: Query<&ChargingStation>,
    relocators: Query<&CarRelocator>,
) {
    if event.0.payload != EventPayload::BinCollection {
        return;
    }
    let now = clock.now();
    let usage = FleetUsage::at(now, cars.iter(), stations.iter(), relocators.iter());
    let interval_ms = bins.interval_ms();
    let bin = bins.record(now, telemetry.counters, usage);

    log::debug!(
        "[{}] bin {}: {} attempts, {} trips, success rate {}",
        format_sim_time(now),
        bin.index,
        bin.delta.reservation_attempts,
        bin.delta.trips_completed,
        bin.ratios
            .success_rate
            .map(|rate| format!("{rate:.3}"))
            .unwrap_or_else(|| "n/a".to_string())
    );
    clock.schedule_in(interval_ms, EventPayload::BinCollection);
}
