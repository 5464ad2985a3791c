//! Error types shared across the engine.
//!
//! Recoverable shortages ([ResourceUnavailable]) are plain values that drive
//! retries and queues. Everything else is a `thiserror` enum that ends the run
//! or the analysis that produced it.

use bevy_ecs::prelude::Resource;
use thiserror::Error;

use crate::clock::{format_sim_time, EventKind};

/// An event was scheduled before the current simulation time.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("cannot schedule {kind:?} at {requested_ms} ms: clock is already at {now_ms} ms")]
pub struct InvalidScheduleError {
    pub kind: EventKind,
    pub requested_ms: u64,
    pub now_ms: u64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{0}")]
    Inconsistent(String),

    #[error("failed to parse scenario parameters: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("insufficient data: {available} usable values, at least {required} required")]
    InsufficientData { available: usize, required: usize },
}

/// A scarce resource could not be acquired right now. Never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceUnavailable {
    NoCarAvailable,
    NoRelocatorIdle,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    InvalidSchedule(#[from] InvalidScheduleError),

    #[error("invariant violated at {}: {message} ({context})", sim_time(.at_ms))]
    InvariantViolation {
        at_ms: u64,
        message: String,
        context: String,
    },

    #[error("missing world resource: {0}")]
    MissingResource(&'static str),
}

fn sim_time(ms: &u64) -> String {
    format_sim_time(*ms)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultRecord {
    pub at_ms: u64,
    pub message: String,
    pub context: String,
}

/// First structural invariant violation observed by a handler. The runner
/// checks it after every event and halts the run when it is set.
#[derive(Debug, Default, Resource)]
pub struct SimulationFault {
    first: Option<FaultRecord>,
}

impl SimulationFault {
    pub fn record(&mut self, at_ms: u64, message: impl Into<String>, context: impl Into<String>) {
        if self.first.is_some() {
            return;
        }
        let record = FaultRecord {
            at_ms,
            message: message.into(),
            context: context.into(),
        };
        log::error!(
            "[{}] invariant violated: {} ({})",
            format_sim_time(at_ms),
            record.message,
            record.context
        );
        self.first = Some(record);
    }

    pub fn is_set(&self) -> bool {
        self.first.is_some()
    }

    pub fn get(&self) -> Option<&FaultRecord> {
        self.first.as_ref()
    }

    pub fn take(&mut self) -> Option<FaultRecord> {
        self.first.take()
    }
}

impl From<FaultRecord> for SimulationError {
    fn from(record: FaultRecord) -> Self {
        SimulationError::InvariantViolation {
            at_ms: record.at_ms,
            message: record.message,
            context: record.context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_keeps_first_record_only() {
        let mut fault = SimulationFault::default();
        fault.record(10, "first", "car 1");
        fault.record(20, "second", "car 2");
        let record = fault.take().expect("fault recorded");
        assert_eq!(record.message, "first");
        assert_eq!(record.at_ms, 10);
        assert!(!fault.is_set());
    }

    #[test]
    fn invariant_violation_message_includes_sim_time() {
        let err = SimulationError::from(FaultRecord {
            at_ms: 61 * 60 * 1000,
            message: "slot released twice".to_string(),
            context: "station 0".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "invariant violated at Day 0, 01:01: slot released twice (station 0)"
        );
    }
}
