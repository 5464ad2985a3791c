//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each step
//! pops the next event from [SimulationClock], inserts it as [CurrentEvent],
//! then runs the schedule. Exactly one handler reacts to each event kind.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::{apply_deferred, ExecutorKind, IntoSystemConfigs};

use crate::clock::{format_sim_time, CurrentEvent, EventKind, EventPayload, SimulationClock};
use crate::error::{SimulationError, SimulationFault};
use crate::profiling::DispatchStats;
use crate::report::SimulationReport;
use crate::scenario::{build_scenario, OperatingRules, ScenarioParams, SimulationEndTimeMs};
use crate::systems::{
    bin_collection::bin_collection_system, charging_complete::charging_complete_system,
    dropoff::dropoff_system, pickup::pickup_system, relocation::relocation_request_system,
    reservation::reservation_system, station_arrival::station_arrival_system,
    user_arrival::user_arrival_system,
};
use crate::telemetry::SimBins;

fn current_kind(event: &Option<Res<CurrentEvent>>) -> Option<EventKind> {
    event.as_ref().map(|e| e.0.kind())
}

// Condition functions for each event kind
fn is_user_arrival(event: Option<Res<CurrentEvent>>) -> bool {
    current_kind(&event) == Some(EventKind::UserArrival)
}

fn is_reservation(event: Option<Res<CurrentEvent>>) -> bool {
    current_kind(&event) == Some(EventKind::Reservation)
}

fn is_pickup(event: Option<Res<CurrentEvent>>) -> bool {
    current_kind(&event) == Some(EventKind::Pickup)
}

fn is_dropoff(event: Option<Res<CurrentEvent>>) -> bool {
    current_kind(&event) == Some(EventKind::Dropoff)
}

fn is_relocation_request(event: Option<Res<CurrentEvent>>) -> bool {
    current_kind(&event) == Some(EventKind::RelocationRequest)
}

fn is_station_arrival(event: Option<Res<CurrentEvent>>) -> bool {
    current_kind(&event) == Some(EventKind::StationArrival)
}

fn is_charging_complete(event: Option<Res<CurrentEvent>>) -> bool {
    current_kind(&event) == Some(EventKind::ChargingComplete)
}

fn is_bin_collection(event: Option<Res<CurrentEvent>>) -> bool {
    current_kind(&event) == Some(EventKind::BinCollection)
}

/// Builds the dispatch schedule: one handler per event kind, gated on the
/// current event, followed by [apply_deferred] so spawns and despawns land
/// before the next step.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            user_arrival_system.run_if(is_user_arrival),
            reservation_system.run_if(is_reservation),
            pickup_system.run_if(is_pickup),
            dropoff_system.run_if(is_dropoff),
            relocation_request_system.run_if(is_relocation_request),
            station_arrival_system.run_if(is_station_arrival),
            charging_complete_system.run_if(is_charging_complete),
            bin_collection_system.run_if(is_bin_collection),
            apply_deferred,
        )
            .chain(),
    );
    schedule
}

/// Schedules the first arrival at time 0 and the first bin collection one
/// interval later. Call after [build_scenario] and before running events.
pub fn initialize_simulation(world: &mut World) -> Result<(), SimulationError> {
    let interval_ms = world
        .get_resource::<SimBins>()
        .map(|bins| bins.interval_ms())
        .or_else(|| {
            world
                .get_resource::<OperatingRules>()
                .map(|rules| rules.bin_interval_ms)
        })
        .ok_or(SimulationError::MissingResource("SimBins"))?;
    let mut clock = world
        .get_resource_mut::<SimulationClock>()
        .ok_or(SimulationError::MissingResource("SimulationClock"))?;
    clock.schedule_at(0, EventPayload::UserArrival)?;
    clock.schedule_at(interval_ms, EventPayload::BinCollection)?;
    Ok(())
}

fn take_fault(world: &mut World) -> Result<(), SimulationError> {
    match world
        .get_resource_mut::<SimulationFault>()
        .and_then(|mut fault| fault.take())
    {
        Some(record) => Err(record.into()),
        None => Ok(()),
    }
}

/// Runs one simulation step: pops the next event, inserts it as [CurrentEvent],
/// then runs the schedule.
///
/// Returns `Ok(false)` when the queue is empty or the next event lies after
/// [SimulationEndTimeMs] (when present); events exactly at the horizon still
/// run. Returns the recorded invariant violation if a handler hit one.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> Result<bool, SimulationError> {
    let stop_at = world.get_resource::<SimulationEndTimeMs>().map(|e| e.0);
    let next_ts = world
        .get_resource::<SimulationClock>()
        .ok_or(SimulationError::MissingResource("SimulationClock"))?
        .next_event_time();
    let Some(ts) = next_ts else {
        return Ok(false);
    };
    if stop_at.is_some_and(|end_ms| ts > end_ms) {
        return Ok(false);
    }

    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return Ok(false),
    };
    world.insert_resource(CurrentEvent(event));

    if let Some(mut stats) = world.get_resource_mut::<DispatchStats>() {
        stats.record_event(event.kind());
    }

    schedule.run(world);
    take_fault(world)?;
    Ok(true)
}

/// Runs steps until the horizon, an empty queue or `max_steps`.
/// Returns the number of steps executed.
pub fn run_until_horizon(
    world: &mut World,
    schedule: &mut Schedule,
    max_steps: usize,
) -> Result<usize, SimulationError> {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule)? {
        steps += 1;
    }
    Ok(steps)
}

/// Everything a finished run leaves behind.
pub struct SimulationOutcome {
    pub world: World,
    pub steps: usize,
    pub report: SimulationReport,
}

impl SimulationOutcome {
    pub fn bins(&self) -> &SimBins {
        self.world.resource::<SimBins>()
    }
}

/// Build, initialize and run a scenario to its horizon, then report.
pub fn run_scenario(params: ScenarioParams) -> Result<SimulationOutcome, SimulationError> {
    let mut world = World::new();
    build_scenario(&mut world, params)?;
    initialize_simulation(&mut world)?;

    let mut schedule = simulation_schedule();
    let steps = run_until_horizon(&mut world, &mut schedule, usize::MAX)?;
    let report = SimulationReport::capture(&mut world);

    let now = world.resource::<SimulationClock>().now();
    log::info!(
        "[{}] run finished after {} events",
        format_sim_time(now),
        steps
    );
    if let Some(stats) = world.get_resource::<DispatchStats>() {
        stats.log_summary();
    }
    report.log_summary();

    Ok(SimulationOutcome {
        world,
        steps,
        report,
    })
}
