pub mod bin_collection;
pub mod charging_complete;
pub mod dropoff;
pub mod pickup;
pub mod relocation;
pub mod reservation;
pub mod station_arrival;
pub mod user_arrival;
