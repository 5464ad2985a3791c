//! Car relocators: staff that drive cars needing charge to a station.
//!
//! A relocator holds at most one [RelocationTask]; "busy" is derived from the
//! task slot, so double assignment cannot be represented.

use std::collections::VecDeque;

use bevy_ecs::prelude::{Component, Entity, Resource};
use thiserror::Error;

use crate::error::ResourceUnavailable;
use crate::spatial::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationTask {
    pub car: Entity,
    pub station: Entity,
    pub assigned_at_ms: u64,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RelocatorError {
    #[error("relocator {relocator_id} is already moving car {current:?}")]
    Busy { relocator_id: u32, current: Entity },

    #[error("relocator {relocator_id} has no task to complete")]
    Idle { relocator_id: u32 },
}

#[derive(Debug, Clone, Component)]
pub struct CarRelocator {
    pub id: u32,
    pub location: Location,
    task: Option<RelocationTask>,
    tasks_completed: u64,
    busy_ms: u64,
}

impl CarRelocator {
    pub fn new(id: u32, location: Location) -> Self {
        Self {
            id,
            location,
            task: None,
            tasks_completed: 0,
            busy_ms: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.task.is_some()
    }

    pub fn task(&self) -> Option<&RelocationTask> {
        self.task.as_ref()
    }

    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed
    }

    /// Busy time up to `now_ms`, including an open task.
    pub fn busy_ms_at(&self, now_ms: u64) -> u64 {
        let open = self
            .task
            .map(|task| now_ms.saturating_sub(task.assigned_at_ms))
            .unwrap_or(0);
        self.busy_ms + open
    }

    pub fn assign(&mut self, task: RelocationTask) -> Result<(), RelocatorError> {
        if let Some(current) = self.task {
            return Err(RelocatorError::Busy {
                relocator_id: self.id,
                current: current.car,
            });
        }
        self.task = Some(task);
        Ok(())
    }

    /// Finishes the current task; the relocator is left idle at `location`.
    pub fn complete(
        &mut self,
        location: Location,
        now_ms: u64,
    ) -> Result<RelocationTask, RelocatorError> {
        let task = self.task.take().ok_or(RelocatorError::Idle {
            relocator_id: self.id,
        })?;
        self.busy_ms += now_ms.saturating_sub(task.assigned_at_ms);
        self.tasks_completed += 1;
        self.location = location;
        Ok(task)
    }
}

/// Closest idle relocator by `distance` from its location; ties go to the lowest id.
pub fn acquire_nearest<'a, I, F>(relocators: I, distance: F) -> Result<Entity, ResourceUnavailable>
where
    I: IntoIterator<Item = (Entity, &'a CarRelocator)>,
    F: Fn(&Location) -> f64,
{
    relocators
        .into_iter()
        .filter(|(_, relocator)| !relocator.is_busy())
        .map(|(entity, relocator)| (entity, relocator.id, distance(&relocator.location)))
        .min_by(|a, b| a.2.total_cmp(&b.2).then_with(|| a.1.cmp(&b.1)))
        .map(|(entity, _, _)| entity)
        .ok_or(ResourceUnavailable::NoRelocatorIdle)
}

/// Cars that need charging but had no idle relocator, in request order.
#[derive(Debug, Default, Resource)]
pub struct RelocationBacklog {
    cars: VecDeque<Entity>,
}

impl RelocationBacklog {
    pub fn push(&mut self, car: Entity) {
        if !self.cars.contains(&car) {
            self.cars.push_back(car);
        }
    }

    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.cars.iter()
    }

    /// Removes and returns the backlogged car with the smallest `distance`;
    /// ties keep backlog order.
    pub fn take_nearest<F>(&mut self, distance: F) -> Option<Entity>
    where
        F: Fn(Entity) -> Option<f64>,
    {
        let index = self
            .cars
            .iter()
            .enumerate()
            .filter_map(|(index, car)| distance(*car).map(|d| (index, d)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
            .map(|(index, _)| index)?;
        self.cars.remove(index)
    }

    pub fn remove(&mut self, car: Entity) -> bool {
        match self.cars.iter().position(|c| *c == car) {
            Some(index) => {
                self.cars.remove(index);
                true
            }
            None => false,
        }
    }
}
