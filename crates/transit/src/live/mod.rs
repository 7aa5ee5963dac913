//! Live vehicle data: the snapshot store and the leg matcher.

pub mod matcher;
pub mod snapshot;

pub use matcher::{Departure, LiveMatcher, LiveOverlay};
pub use snapshot::{Occupancy, SnapshotStore, VehiclePosition, VehicleRecord, VehicleSnapshot};
