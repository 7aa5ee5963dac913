//! In-memory catalog provider.
//!
//! This is the core implementation that stores all stops and routes in memory
//! with a spatial index for nearby-stop queries. It is built once at startup
//! and never mutated afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use geo::{LineString, Point};
use rstar::RTree;

use crate::identifiers::*;
use crate::models::{traits::*, types::*};
use crate::spatial::index::StopNode;
use crate::spatial::queries::{haversine_distance, search_radius_degrees};

/// How many R-tree neighbours are re-ranked by haversine distance when
/// looking for the single closest stop
const NEAREST_CANDIDATES: usize = 16;

// ============================================================================
// Concrete Implementations of Traits
// ============================================================================

#[derive(Clone, Debug)]
pub struct StopImpl {
    pub id: StopIdentifier,
    pub name: Arc<str>,
    pub location: Point,
    pub mode: Option<RouteMode>,
}

impl TransitStop for StopImpl {
    fn id(&self) -> &StopIdentifier {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> Point {
        self.location
    }

    fn mode(&self) -> Option<RouteMode> {
        self.mode
    }
}

#[derive(Clone, Debug)]
pub struct RouteImpl {
    pub id: RouteIdentifier,
    pub name: Arc<str>,
    pub mode: RouteMode,
    pub color: Option<Arc<str>>,
    pub stop_ids: Vec<StopIdentifier>,
    pub waypoints: Option<LineString>,
    pub average_speed_kmh: Option<f64>,
    pub bidirectional: bool,
    pub destinations: Vec<Arc<str>>,
}

impl Route for RouteImpl {
    fn id(&self) -> &RouteIdentifier {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> RouteMode {
        self.mode
    }

    fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    fn stop_sequence(&self) -> &[StopIdentifier] {
        &self.stop_ids
    }

    fn waypoints(&self) -> Option<&LineString> {
        self.waypoints.as_ref()
    }

    fn average_speed_kmh(&self) -> f64 {
        self.average_speed_kmh
            .unwrap_or_else(|| self.mode.default_speed_kmh())
    }

    fn bidirectional(&self) -> bool {
        self.bidirectional
    }

    fn destinations(&self) -> &[Arc<str>] {
        &self.destinations
    }
}

// ============================================================================
// Static Provider
// ============================================================================

/// In-memory catalog with spatial indexing
///
/// This type is cheap to clone since all data is stored in `Arc`s.
#[derive(Clone)]
pub struct StaticTransitProvider {
    // Core data
    stops: Vec<Arc<StopImpl>>,
    routes: Vec<Arc<RouteImpl>>,

    // Lookup maps
    stop_map: HashMap<StopIdentifier, Arc<StopImpl>>,
    stop_names: HashMap<String, StopIdentifier>,
    route_map: HashMap<RouteIdentifier, Arc<RouteImpl>>,
    routes_by_stop: HashMap<StopIdentifier, Vec<Arc<RouteImpl>>>,

    // Spatial index
    stop_tree: RTree<StopNode>,

    service_area: Option<ServiceArea>,
}

impl StaticTransitProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self {
            stops: Vec::new(),
            routes: Vec::new(),
            stop_map: HashMap::new(),
            stop_names: HashMap::new(),
            route_map: HashMap::new(),
            routes_by_stop: HashMap::new(),
            stop_tree: RTree::new(),
            service_area: None,
        }
    }

    /// Build provider from raw data (used by the catalog loaders)
    ///
    /// Fails with [`TransitError::DataLoad`] on duplicate ids, routes with no
    /// stops, or route stop references missing from `stops`.
    pub fn from_data(stops: Vec<StopImpl>, routes: Vec<RouteImpl>) -> Result<Self> {
        let stops: Vec<Arc<StopImpl>> = stops.into_iter().map(Arc::new).collect();
        let mut routes: Vec<Arc<RouteImpl>> = routes.into_iter().map(Arc::new).collect();
        routes.sort_by(|a, b| a.id.cmp(&b.id));

        // Build lookup maps
        let mut stop_map = HashMap::with_capacity(stops.len());
        let mut stop_names = HashMap::with_capacity(stops.len());
        for stop in &stops {
            if stop_map.insert(stop.id.clone(), stop.clone()).is_some() {
                return Err(TransitError::DataLoad(format!("duplicate stop id {}", stop.id)));
            }
            // First stop listed under a name wins name lookups
            stop_names
                .entry(stop.name.to_lowercase())
                .or_insert_with(|| stop.id.clone());
        }

        let mut route_map = HashMap::with_capacity(routes.len());
        let mut routes_by_stop: HashMap<StopIdentifier, Vec<Arc<RouteImpl>>> = HashMap::new();
        for route in &routes {
            if route_map.insert(route.id.clone(), route.clone()).is_some() {
                return Err(TransitError::DataLoad(format!("duplicate route id {}", route.id)));
            }

            if route.stop_ids.is_empty() {
                return Err(TransitError::DataLoad(format!("route {} has no stops", route.id)));
            }

            let mut seen = HashSet::new();
            for stop_id in &route.stop_ids {
                if !stop_map.contains_key(stop_id) {
                    return Err(TransitError::DataLoad(format!(
                        "route {} references unknown stop {}",
                        route.id, stop_id
                    )));
                }
                if seen.insert(stop_id.clone()) {
                    routes_by_stop
                        .entry(stop_id.clone())
                        .or_default()
                        .push(route.clone());
                }
            }
        }

        // Build spatial index
        let stop_tree = RTree::bulk_load(
            stops
                .iter()
                .map(|s| StopNode::new(s.location, s.clone()))
                .collect(),
        );

        tracing::debug!(stops = stops.len(), routes = routes.len(), "built static catalog");

        Ok(Self {
            stops,
            routes,
            stop_map,
            stop_names,
            route_map,
            routes_by_stop,
            stop_tree,
            service_area: None,
        })
    }

    pub fn with_service_area(mut self, area: ServiceArea) -> Self {
        self.service_area = Some(area);
        self
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

impl Default for StaticTransitProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitProvider for StaticTransitProvider {
    fn get_stop(&self, id: &StopIdentifier) -> Option<Arc<dyn TransitStop>> {
        self.stop_map.get(id).map(|s| s.clone() as Arc<dyn TransitStop>)
    }

    fn get_route(&self, id: &RouteIdentifier) -> Option<Arc<dyn Route>> {
        self.route_map.get(id).map(|r| r.clone() as Arc<dyn Route>)
    }

    fn resolve_stop(&self, reference: &str) -> Option<Arc<dyn TransitStop>> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }

        self.get_stop(&StopIdentifier::new(reference)).or_else(|| {
            self.stop_names
                .get(&reference.to_lowercase())
                .and_then(|id| self.get_stop(id))
        })
    }

    fn all_stops(&self) -> Vec<Arc<dyn TransitStop>> {
        self.stops
            .iter()
            .map(|s| s.clone() as Arc<dyn TransitStop>)
            .collect()
    }

    fn all_routes(&self) -> Vec<Arc<dyn Route>> {
        self.routes
            .iter()
            .map(|r| r.clone() as Arc<dyn Route>)
            .collect()
    }

    fn routes_serving(&self, stop: &StopIdentifier) -> Vec<Arc<dyn Route>> {
        // Routes were sorted by id before the index was built
        self.routes_by_stop
            .get(stop)
            .map(|routes| {
                routes
                    .iter()
                    .map(|r| r.clone() as Arc<dyn Route>)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn service_area(&self) -> Option<ServiceArea> {
        self.service_area
    }

    fn stops_near(
        &self,
        point: Point,
        radius_m: f64,
        limit: usize,
    ) -> Vec<(Arc<dyn TransitStop>, f64)> {
        // Validate radius is positive
        if radius_m <= 0.0 || !radius_m.is_finite() || limit == 0 {
            return Vec::new();
        }

        let degrees = search_radius_degrees(radius_m, point.y());
        let mut nearby: Vec<(Arc<StopImpl>, f64)> = self
            .stop_tree
            .locate_within_distance([point.x(), point.y()], degrees * degrees)
            .map(|node| (node.stop.clone(), haversine_distance(point, node.stop.location)))
            .filter(|(_, distance)| *distance <= radius_m)
            .collect();

        nearby.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));
        nearby.truncate(limit);

        nearby
            .into_iter()
            .map(|(stop, distance)| (stop as Arc<dyn TransitStop>, distance))
            .collect()
    }

    fn nearest_stop(&self, point: Point) -> Option<(Arc<dyn TransitStop>, f64)> {
        self.stop_tree
            .nearest_neighbor_iter(&[point.x(), point.y()])
            .take(NEAREST_CANDIDATES)
            .map(|node| (node.stop.clone(), haversine_distance(point, node.stop.location)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(stop, distance)| (stop as Arc<dyn TransitStop>, distance))
    }
}
