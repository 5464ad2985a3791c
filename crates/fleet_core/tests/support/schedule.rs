#![allow(dead_code)]

use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use fleet_core::runner::{run_next_event, run_until_horizon, simulation_schedule};
use fleet_core::scenario::SimulationEndTimeMs;

/// Helper that owns a reusable `Schedule` so tests can step or drain the event queue.
pub struct ScheduleRunner {
    schedule: Schedule,
}

impl Default for ScheduleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRunner {
    pub fn new() -> Self {
        Self {
            schedule: simulation_schedule(),
        }
    }

    /// Run a single event (returns `true` if an event was processed).
    pub fn run_one(&mut self, world: &mut World) -> bool {
        run_next_event(world, &mut self.schedule).expect("event should not fault")
    }

    /// Run every event up to and including `end_ms`.
    pub fn run_until(&mut self, world: &mut World, end_ms: u64) -> usize {
        world.insert_resource(SimulationEndTimeMs(end_ms));
        run_until_horizon(world, &mut self.schedule, usize::MAX).expect("run should not fault")
    }

    /// Drain the queue (bounded by `max_steps`).
    pub fn run_full(&mut self, world: &mut World, max_steps: usize) -> usize {
        world.remove_resource::<SimulationEndTimeMs>();
        run_until_horizon(world, &mut self.schedule, max_steps).expect("run should not fault")
    }
}
