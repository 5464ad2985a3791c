pub mod car;
pub mod clock;
pub mod distributions;
pub mod ecs;
pub mod error;
pub mod profiling;
pub mod registry;
pub mod relocator;
pub mod report;
pub mod routing;
pub mod runner;
pub mod scenario;
pub mod spatial;
pub mod spawner;
pub mod station;
pub mod stats;
pub mod systems;
pub mod telemetry;
pub mod telemetry_export;
pub mod traffic;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;
