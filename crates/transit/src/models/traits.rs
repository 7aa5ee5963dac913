//! Core traits for catalog entities.
//!
//! These traits define the public interface for stop and route data.
//! The planner and matcher only see these, so fixture catalogs and the
//! bundled static catalog are interchangeable.

use geo::{LineString, Point};
use std::sync::Arc;

use crate::identifiers::*;
use crate::models::types::*;

// ============================================================================
// Core Entity Traits
// ============================================================================

/// A transit stop (single boarding location)
pub trait TransitStop: Send + Sync {
    fn id(&self) -> &StopIdentifier;
    fn name(&self) -> &str;

    /// Location as (x = longitude, y = latitude)
    fn location(&self) -> Point;

    /// Mode the stop is primarily served by, if the catalog says
    fn mode(&self) -> Option<RouteMode> {
        None
    }
}

/// A transit route (e.g., "Route 174", "Seaford Line")
pub trait Route: Send + Sync {
    fn id(&self) -> &RouteIdentifier;

    /// Display name (e.g., "Route 174", "Glenelg Tram")
    fn name(&self) -> &str;

    fn mode(&self) -> RouteMode;

    /// Optional color for display (hex RGB, e.g., "#0072c6")
    fn color(&self) -> Option<&str> {
        None
    }

    /// Stops in the order the route serves them
    fn stop_sequence(&self) -> &[StopIdentifier];

    /// Drawn path of the route, may be absent
    fn waypoints(&self) -> Option<&LineString>;

    /// Average running speed used to estimate ride times
    fn average_speed_kmh(&self) -> f64 {
        self.mode().default_speed_kmh()
    }

    /// Whether the route also runs against the listed stop order
    fn bidirectional(&self) -> bool {
        false
    }

    /// Headsign destinations (e.g., "Seaford", "Adelaide")
    fn destinations(&self) -> &[Arc<str>] {
        &[]
    }

    fn serves(&self, stop: &StopIdentifier) -> bool {
        self.stop_sequence().contains(stop)
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Provider of catalog data with lookup and query methods
pub trait TransitProvider: Send + Sync {
    // ---- Lookups ----
    fn get_stop(&self, id: &StopIdentifier) -> Option<Arc<dyn TransitStop>>;
    fn get_route(&self, id: &RouteIdentifier) -> Option<Arc<dyn Route>>;

    /// Resolve a caller-supplied stop reference: id first, then name
    fn resolve_stop(&self, reference: &str) -> Option<Arc<dyn TransitStop>>;

    fn find_stop(&self, id: &StopIdentifier) -> Result<Arc<dyn TransitStop>> {
        self.get_stop(id)
            .ok_or_else(|| TransitError::StopNotFound(id.to_string()))
    }

    fn find_route(&self, id: &RouteIdentifier) -> Result<Arc<dyn Route>> {
        self.get_route(id)
            .ok_or_else(|| TransitError::RouteNotFound(id.clone()))
    }

    // ---- Collections ----
    fn all_stops(&self) -> Vec<Arc<dyn TransitStop>>;
    fn all_routes(&self) -> Vec<Arc<dyn Route>>;

    /// Every route whose stop sequence contains `stop`, ordered by route id
    fn routes_serving(&self, stop: &StopIdentifier) -> Vec<Arc<dyn Route>>;

    /// Area vehicles are expected to be in, if the catalog declares one
    fn service_area(&self) -> Option<ServiceArea> {
        None
    }

    // ---- Spatial queries ----

    /// Stops within `radius_m` meters, nearest first, at most `limit`
    fn stops_near(
        &self,
        point: Point,
        radius_m: f64,
        limit: usize,
    ) -> Vec<(Arc<dyn TransitStop>, f64)>;

    /// The single closest stop and its distance in meters
    fn nearest_stop(&self, point: Point) -> Option<(Arc<dyn TransitStop>, f64)>;
}
