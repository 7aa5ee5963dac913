//! Catalog loading from a GTFS static feed.
//!
//! Each route's stop sequence is taken from its longest trip. A route is
//! treated as bidirectional when some trip starts where that trip ends.

use std::collections::HashMap;
use std::sync::Arc;

use geo::{Coord, LineString, Point};
use gtfs_structures::{Gtfs, RouteType};

use crate::identifiers::*;
use crate::models::types::*;
use crate::provider::loader::validate_coordinate;
use crate::provider::static_provider::{RouteImpl, StaticTransitProvider, StopImpl};

fn gtfs_route_type(route_type: &RouteType) -> u16 {
    match route_type {
        RouteType::Tramway => 0,
        RouteType::Subway => 1,
        RouteType::Rail => 2,
        RouteType::Bus | RouteType::Coach => 3,
        RouteType::Ferry => 4,
        RouteType::CableCar => 5,
        RouteType::Gondola => 6,
        RouteType::Funicular => 7,
        RouteType::Other(value) => u16::try_from(*value).unwrap_or(u16::MAX),
        _ => u16::MAX,
    }
}

impl StaticTransitProvider {
    /// Build a catalog from a GTFS zip or directory.
    ///
    /// Stops without coordinates and routes of modes this network does not
    /// run are skipped.
    pub fn from_gtfs(path: &str) -> Result<Self> {
        let gtfs = Gtfs::new(path).map_err(|e| TransitError::DataLoad(format!("{path}: {e}")))?;

        let mut stops = Vec::with_capacity(gtfs.stops.len());
        for stop in gtfs.stops.values() {
            let (Some(lat), Some(lon)) = (stop.latitude, stop.longitude) else {
                continue;
            };
            if validate_coordinate(lat, lon).is_err() {
                tracing::warn!(stop = %stop.id, "skipping stop with invalid coordinates");
                continue;
            }
            let name = stop.name.clone().unwrap_or_else(|| stop.id.clone());
            stops.push(StopImpl {
                id: StopIdentifier::new(&stop.id),
                name: name.into(),
                location: Point::new(lon, lat),
                mode: None,
            });
        }
        let located: std::collections::HashSet<&str> =
            stops.iter().map(|s| s.id.as_str()).collect();

        // Longest trip per route, ties to the lowest trip id
        let mut longest: HashMap<&str, &gtfs_structures::Trip> = HashMap::new();
        for trip in gtfs.trips.values() {
            let entry = longest.entry(trip.route_id.as_str()).or_insert(trip);
            let key = (std::cmp::Reverse(trip.stop_times.len()), trip.id.as_str());
            if key < (std::cmp::Reverse(entry.stop_times.len()), entry.id.as_str()) {
                *entry = trip;
            }
        }

        let mut routes = Vec::with_capacity(longest.len());
        for (route_id, trip) in longest {
            let Some(route) = gtfs.routes.get(route_id) else {
                continue;
            };
            let Some(mode) = RouteMode::from_gtfs(gtfs_route_type(&route.route_type)) else {
                continue;
            };

            let stop_ids: Vec<StopIdentifier> = trip
                .stop_times
                .iter()
                .map(|st| st.stop.id.as_str())
                .filter(|id| located.contains(id))
                .map(StopIdentifier::new)
                .collect();
            let (Some(first), Some(last)) = (stop_ids.first(), stop_ids.last()) else {
                continue;
            };

            let bidirectional = gtfs.trips.values().any(|other| {
                other.route_id == route_id
                    && other.stop_times.first().map(|st| st.stop.id.as_str()) == Some(last.as_str())
                    && other.stop_times.last().map(|st| st.stop.id.as_str()) == Some(first.as_str())
            });

            let waypoints = trip
                .shape_id
                .as_ref()
                .and_then(|shape_id| gtfs.shapes.get(shape_id))
                .map(|points| {
                    let mut points = points.clone();
                    points.sort_by_key(|p| p.sequence);
                    LineString::new(
                        points
                            .iter()
                            .map(|p| Coord { x: p.longitude, y: p.latitude })
                            .collect(),
                    )
                });

            let name = route
                .short_name
                .clone()
                .filter(|n| !n.is_empty())
                .map(|n| format!("Route {n}"))
                .or_else(|| route.long_name.clone())
                .unwrap_or_else(|| format!("Route {route_id}"));

            routes.push(RouteImpl {
                id: RouteIdentifier::new(route_id),
                name: Arc::from(name),
                mode,
                color: None,
                stop_ids,
                waypoints,
                average_speed_kmh: None,
                bidirectional,
                destinations: Vec::new(),
            });
        }

        let provider = Self::from_data(stops, routes)?;
        tracing::info!(
            stops = provider.stop_count(),
            routes = provider.route_count(),
            "loaded GTFS catalog from {path}"
        );
        Ok(provider)
    }
}
