//! The transit service: catalog, planner, matcher and live snapshot behind
//! one handle.
//!
//! Everything here is `&self`; the service is shared behind an `Arc` by the
//! HTTP layer. Catalog data never changes after construction and the only
//! mutable state is the snapshot store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use geo::Point;

use crate::identifiers::*;
use crate::live::{
    Departure, LiveMatcher, SnapshotStore, VehiclePosition, VehicleRecord, VehicleSnapshot,
};
use crate::models::fares::FareSchedule;
use crate::models::traits::*;
use crate::models::types::*;
use crate::planner::{PlanOutcome, PlannerConfig, TripPlanner, TripQuery};

pub const DEFAULT_NEARBY_RADIUS_M: f64 = 500.0;
pub const DEFAULT_NEARBY_LIMIT: usize = 5;

/// Result of replacing the vehicle snapshot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnapshotUpdate {
    pub accepted: usize,
    pub rejected: usize,
}

/// Live feed health as seen from the snapshot store
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceStatus {
    pub connected: bool,
    pub vehicles_cached: usize,
    pub last_update: Option<DateTime<Utc>>,
}

/// Current vehicles after filtering
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleListing {
    pub vehicles: Vec<VehiclePosition>,
    pub captured_at: Option<DateTime<Utc>>,
    /// The snapshot holds at least one vehicle, whatever the filters kept
    pub live: bool,
}

/// Live vehicles on their way to one stop
#[derive(Clone)]
pub struct StopDepartures {
    pub stop: Arc<dyn TransitStop>,
    pub departures: Vec<Departure>,
    pub captured_at: Option<DateTime<Utc>>,
}

pub struct TransitService {
    provider: Arc<dyn TransitProvider>,
    planner: TripPlanner,
    matcher: LiveMatcher,
    snapshots: SnapshotStore,
    service_area: ServiceArea,
}

impl TransitService {
    pub fn new(provider: Arc<dyn TransitProvider>) -> Self {
        Self::with_config(provider, PlannerConfig::default(), FareSchedule::default())
    }

    pub fn with_config(
        provider: Arc<dyn TransitProvider>,
        config: PlannerConfig,
        fares: FareSchedule,
    ) -> Self {
        let service_area = provider.service_area().unwrap_or(ServiceArea::ADELAIDE);
        Self {
            planner: TripPlanner::with_config(provider.clone(), config, fares),
            matcher: LiveMatcher::new(provider.clone()),
            snapshots: SnapshotStore::new(),
            service_area,
            provider,
        }
    }

    pub fn provider(&self) -> &dyn TransitProvider {
        self.provider.as_ref()
    }

    pub fn planner(&self) -> &TripPlanner {
        &self.planner
    }

    // ---- Planning ----

    /// Plan a trip and attach live vehicles from the snapshot current now
    pub fn plan_trip(&self, query: &TripQuery) -> Result<PlanOutcome> {
        let mut outcome = self.planner.plan(query)?;
        let snapshot = self.snapshots.current();
        self.matcher.enrich_all(outcome.itineraries_mut(), &snapshot);
        Ok(outcome)
    }

    // ---- Catalog ----

    pub fn nearby_stops(
        &self,
        lat: f64,
        lon: f64,
        radius_m: Option<f64>,
        limit: Option<usize>,
    ) -> Vec<(Arc<dyn TransitStop>, f64)> {
        self.provider.stops_near(
            Point::new(lon, lat),
            radius_m.unwrap_or(DEFAULT_NEARBY_RADIUS_M),
            limit.unwrap_or(DEFAULT_NEARBY_LIMIT),
        )
    }

    pub fn closest_stop(&self, lat: f64, lon: f64) -> Option<(Arc<dyn TransitStop>, f64)> {
        self.provider.nearest_stop(Point::new(lon, lat))
    }

    pub fn stops(&self) -> Vec<Arc<dyn TransitStop>> {
        self.provider.all_stops()
    }

    /// All routes, or only those of `mode`, ordered by id
    pub fn routes_by_mode(&self, mode: Option<RouteMode>) -> Vec<Arc<dyn Route>> {
        self.provider
            .all_routes()
            .into_iter()
            .filter(|route| mode.map_or(true, |m| route.mode() == m))
            .collect()
    }

    /// Display name for a raw stop id from the realtime feed.
    ///
    /// Feed ids do not always match catalog ids exactly, so this tries the
    /// id as given, upper-cased, without leading zeros, and the first run
    /// of digits in it before falling back to a generic label.
    pub fn stop_display_name(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return "Unknown".to_string();
        }

        let upper = raw.to_uppercase();
        let digits = first_digit_run(raw);
        let candidates = [
            Some(raw),
            Some(upper.as_str()),
            Some(raw.trim_start_matches('0')),
            digits,
            digits.map(|d| d.trim_start_matches('0')),
        ];

        let found = candidates
            .into_iter()
            .flatten()
            .filter(|candidate| !candidate.is_empty())
            .find_map(|candidate| self.provider.get_stop(&StopIdentifier::new(candidate)));

        match found {
            Some(stop) => stop.name().to_string(),
            None if raw.chars().count() <= 4 => format!("Stop {raw}"),
            None => format!("Stop {}", raw.chars().take(20).collect::<String>()),
        }
    }

    /// Catalog name for a feed route id, then the known line names, then a
    /// generic label
    pub fn route_name(&self, route_id: &RouteIdentifier) -> String {
        match self.provider.get_route(route_id) {
            Some(route) => route.name().to_string(),
            None => feed_route_name(route_id.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Route {route_id}")),
        }
    }

    /// Catalog mode for a feed route id, else inferred from the id itself
    pub fn route_mode(&self, route_id: &RouteIdentifier) -> RouteMode {
        self.provider
            .get_route(route_id)
            .map(|route| route.mode())
            .unwrap_or_else(|| RouteMode::infer_from_route_id(route_id.as_str()))
    }

    /// Headsign for a feed route id. Unknown routes head to the city.
    pub fn route_destination(&self, route_id: &RouteIdentifier) -> String {
        self.provider
            .get_route(route_id)
            .and_then(|route| route.destinations().first().map(|d| d.to_string()))
            .or_else(|| feed_route_destination(route_id.as_str()).map(str::to_string))
            .unwrap_or_else(|| "City".to_string())
    }

    // ---- Live data ----

    /// Validate feed records and replace the snapshot with those that pass.
    ///
    /// Records that fail validation or report a position outside the
    /// service area are dropped. The snapshot is replaced even when every
    /// record is dropped.
    pub fn update_vehicle_snapshot(
        &self,
        records: Vec<VehicleRecord>,
        captured_at: DateTime<Utc>,
    ) -> SnapshotUpdate {
        let total = records.len();
        let mut vehicles = Vec::with_capacity(total);

        for record in records {
            match VehiclePosition::try_from(record) {
                Ok(vehicle) if self.service_area.contains(vehicle.lat(), vehicle.lon()) => {
                    vehicles.push(vehicle)
                }
                Ok(vehicle) => {
                    tracing::warn!(
                        vehicle = %vehicle.vehicle_id,
                        lat = vehicle.lat(),
                        lon = vehicle.lon(),
                        "dropping vehicle outside the service area"
                    );
                }
                Err(e) => tracing::warn!("dropping vehicle record: {e}"),
            }
        }

        let accepted = vehicles.len();
        self.snapshots.replace(VehicleSnapshot::new(vehicles, captured_at));
        tracing::info!(accepted, rejected = total - accepted, "vehicle snapshot replaced");

        SnapshotUpdate {
            accepted,
            rejected: total - accepted,
        }
    }

    pub fn vehicles(&self, route: Option<&str>, mode: Option<RouteMode>) -> VehicleListing {
        let snapshot = self.snapshots.current();
        let route = route.map(str::trim).filter(|r| !r.is_empty());

        let vehicles = snapshot
            .vehicles
            .iter()
            .filter(|v| route.map_or(true, |r| v.route_id.as_str() == r))
            .filter(|v| mode.map_or(true, |m| self.route_mode(&v.route_id) == m))
            .cloned()
            .collect();

        VehicleListing {
            vehicles,
            captured_at: snapshot.captured_at,
            live: !snapshot.is_empty(),
        }
    }

    /// Upcoming departures at a stop from the current snapshot
    pub fn departures(&self, stop: &str) -> Result<StopDepartures> {
        let stop = self
            .provider
            .resolve_stop(stop.trim())
            .ok_or_else(|| TransitError::StopNotFound(stop.to_string()))?;
        let snapshot = self.snapshots.current();
        let departures = self.matcher.departures(stop.id(), &snapshot);

        Ok(StopDepartures {
            stop,
            departures,
            captured_at: snapshot.captured_at,
        })
    }

    pub fn snapshot(&self) -> Arc<VehicleSnapshot> {
        self.snapshots.current()
    }

    /// Connected means the current snapshot holds vehicles; a push where
    /// every record was dropped counts as disconnected
    pub fn status(&self) -> ServiceStatus {
        let snapshot = self.snapshots.current();
        ServiceStatus {
            connected: !snapshot.is_empty(),
            vehicles_cached: snapshot.len(),
            last_update: snapshot.captured_at,
        }
    }
}

fn first_digit_run(value: &str) -> Option<&str> {
    let start = value.find(|c: char| c.is_ascii_digit())?;
    let rest = &value[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}
