//! # metro-transit
//!
//! Trip planning and live vehicle data for Adelaide Metro.
//!
//! ## Features
//!
//! - **Static catalog**: stops and routes loaded once from JSON (or a GTFS
//!   feed with the `gtfs` feature) and never mutated
//! - **Spatial queries**: R-tree backed nearby and closest stop lookups
//! - **Itinerary planning**: direct and single-transfer trips with fares
//! - **Live overlay**: vehicles from the latest feed snapshot attached to
//!   planned legs
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use metro_transit::prelude::*;
//!
//! let catalog = r#"{
//!     "stops": [
//!         { "id": "a", "name": "Victoria Square", "lat": -34.9285, "lon": 138.598 },
//!         { "id": "b", "name": "Adelaide Railway Station", "lat": -34.921115, "lon": 138.595834 }
//!     ],
//!     "routes": [{ "id": "99C", "mode": "bus", "stops": ["a", "b"] }]
//! }"#;
//! let provider = StaticTransitProvider::from_json_str(catalog).unwrap();
//! let service = TransitService::new(Arc::new(provider));
//!
//! let departure = NaiveDate::from_ymd_opt(2025, 10, 15)
//!     .unwrap()
//!     .and_hms_opt(11, 45, 0)
//!     .unwrap();
//! let outcome = service
//!     .plan_trip(&TripQuery::new("Victoria Square", "b", departure))
//!     .unwrap();
//! assert_eq!(outcome.itineraries()[0].transfer_count, 0);
//! ```

pub mod identifiers;
pub mod live;
pub mod models;
pub mod planner;
pub mod provider;
pub mod service;
pub mod spatial;

// Re-exports for convenience
pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::live::{
        Departure, LiveMatcher, LiveOverlay, Occupancy, SnapshotStore, VehiclePosition,
        VehicleRecord, VehicleSnapshot,
    };
    pub use crate::models::{fares::*, traits::*, types::*};
    pub use crate::planner::{
        Itinerary, Leg, LegKind, PlanOutcome, PlannerConfig, TripPlanner, TripQuery,
    };
    pub use crate::provider::{RouteImpl, StaticTransitProvider, StopImpl};
    pub use crate::service::{
        ServiceStatus, SnapshotUpdate, StopDepartures, TransitService, VehicleListing,
    };
}

pub use prelude::*;
