//! Vehicle positions and the current snapshot.
//!
//! The feed collector pushes whole snapshots. Records are validated once at
//! this boundary; everything downstream works with [`VehiclePosition`].

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};

use crate::identifiers::*;
use crate::models::types::*;
use crate::provider::loader::validate_coordinate;

/// How full a vehicle is, as reported by the feed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupancy {
    #[serde(alias = "EMPTY")]
    Empty,
    #[serde(alias = "MANY_SEATS_AVAILABLE")]
    ManySeatsAvailable,
    #[serde(alias = "FEW_SEATS_AVAILABLE")]
    FewSeatsAvailable,
    #[serde(alias = "STANDING_ROOM_ONLY")]
    StandingRoomOnly,
    #[serde(alias = "CRUSHED_STANDING_ROOM_ONLY")]
    CrushedStandingRoomOnly,
    #[serde(alias = "FULL")]
    Full,
    #[serde(alias = "NOT_ACCEPTING_PASSENGERS")]
    NotAcceptingPassengers,
}

impl Occupancy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::ManySeatsAvailable => "many_seats_available",
            Self::FewSeatsAvailable => "few_seats_available",
            Self::StandingRoomOnly => "standing_room_only",
            Self::CrushedStandingRoomOnly => "crushed_standing_room_only",
            Self::Full => "full",
            Self::NotAcceptingPassengers => "not_accepting_passengers",
        }
    }
}

/// A vehicle as the feed collector sends it. Nothing here is trusted yet.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    #[serde(default, alias = "id", alias = "vehicle_id")]
    pub vehicle_id: Option<String>,
    #[serde(default, alias = "route_id")]
    pub route_id: Option<String>,
    #[serde(default, alias = "trip_id")]
    pub trip_id: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default, alias = "speed", alias = "speed_kmh")]
    pub speed_kmh: Option<f64>,
    #[serde(default, alias = "bearing")]
    pub heading: Option<f64>,
    #[serde(default, alias = "next_stop_id")]
    pub next_stop_id: Option<String>,
    #[serde(default, alias = "arrival_minutes", alias = "eta_minutes")]
    pub eta_minutes: Option<u32>,
    #[serde(default)]
    pub occupancy: Option<Occupancy>,
    /// Unix seconds
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A validated vehicle position
#[derive(Clone, Debug, PartialEq)]
pub struct VehiclePosition {
    pub vehicle_id: VehicleIdentifier,
    pub route_id: RouteIdentifier,
    pub trip_id: Option<Arc<str>>,
    pub location: Point,
    pub speed_kmh: f64,
    /// Degrees clockwise from north, in `[0, 360)`, when reported
    pub heading: Option<f64>,
    pub next_stop: Option<StopIdentifier>,
    pub eta_minutes: Option<u32>,
    pub occupancy: Option<Occupancy>,
    pub timestamp: Option<i64>,
}

impl VehiclePosition {
    pub fn lat(&self) -> f64 {
        self.location.y()
    }

    pub fn lon(&self) -> f64 {
        self.location.x()
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(TransitError::InvalidData(format!("missing {field}"))),
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<VehicleRecord> for VehiclePosition {
    type Error = TransitError;

    fn try_from(record: VehicleRecord) -> Result<Self> {
        let vehicle_id = required(record.vehicle_id, "vehicle id")?;
        let route_id = required(record.route_id, "route id")?;

        let (Some(lat), Some(lon)) = (record.lat, record.lon) else {
            return Err(TransitError::InvalidData(format!(
                "vehicle {vehicle_id} has no position"
            )));
        };
        validate_coordinate(lat, lon)
            .map_err(|e| TransitError::InvalidData(format!("vehicle {vehicle_id}: {e}")))?;

        let speed_kmh = record.speed_kmh.unwrap_or(0.0);
        if !speed_kmh.is_finite() || speed_kmh < 0.0 {
            return Err(TransitError::InvalidData(format!(
                "vehicle {vehicle_id} has invalid speed {speed_kmh}"
            )));
        }

        if record.heading.is_some_and(|h| !h.is_finite()) {
            return Err(TransitError::InvalidData(format!(
                "vehicle {vehicle_id} has invalid heading"
            )));
        }

        Ok(Self {
            vehicle_id: VehicleIdentifier::new(vehicle_id),
            route_id: RouteIdentifier::new(route_id),
            trip_id: optional(record.trip_id).map(Into::into),
            location: Point::new(lon, lat),
            speed_kmh,
            heading: record.heading.map(|h| h.rem_euclid(360.0)),
            next_stop: optional(record.next_stop_id).map(StopIdentifier::new),
            eta_minutes: record.eta_minutes,
            occupancy: record.occupancy,
            timestamp: record.timestamp,
        })
    }
}

/// Every vehicle the feed reported in one poll
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VehicleSnapshot {
    pub vehicles: Vec<VehiclePosition>,
    /// `None` until the first snapshot arrives
    pub captured_at: Option<DateTime<Utc>>,
}

impl VehicleSnapshot {
    pub fn new(vehicles: Vec<VehiclePosition>, captured_at: DateTime<Utc>) -> Self {
        Self {
            vehicles,
            captured_at: Some(captured_at),
        }
    }

    /// No live data. Also what an unavailable feed looks like.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn on_route<'a, 'r>(
        &'a self,
        route: &'r RouteIdentifier,
    ) -> impl Iterator<Item = &'a VehiclePosition> + use<'a, 'r> {
        self.vehicles.iter().filter(move |v| &v.route_id == route)
    }
}

/// Holder of the current snapshot.
///
/// Readers clone the `Arc` and then work on an immutable value, so a plan
/// request never observes half of one poll and half of the next.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<VehicleSnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<VehicleSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new snapshot, returning the one it replaced
    pub fn replace(&self, snapshot: VehicleSnapshot) -> Arc<VehicleSnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, route: &str, lat: f64, lon: f64) -> VehicleRecord {
        VehicleRecord {
            vehicle_id: Some(id.into()),
            route_id: Some(route.into()),
            lat: Some(lat),
            lon: Some(lon),
            ..Default::default()
        }
    }

    #[test]
    fn test_record_validation() {
        let position = VehiclePosition::try_from(VehicleRecord {
            heading: Some(-90.0),
            speed_kmh: Some(42.5),
            next_stop_id: Some(" s_marion ".into()),
            ..record("bus-1", "174", -35.0, 138.55)
        })
        .unwrap();
        assert_eq!(position.heading, Some(270.0));
        assert_eq!(position.next_stop.as_ref().map(|s| s.as_str()), Some("s_marion"));
        assert_eq!(position.lat(), -35.0);

        let missing_route = VehicleRecord {
            route_id: Some("  ".into()),
            ..record("bus-2", "174", -35.0, 138.55)
        };
        assert!(matches!(
            VehiclePosition::try_from(missing_route),
            Err(TransitError::InvalidData(_))
        ));

        let bad_lat = record("bus-3", "174", f64::NAN, 138.55);
        assert!(VehiclePosition::try_from(bad_lat).is_err());

        let negative_speed = VehicleRecord {
            speed_kmh: Some(-1.0),
            ..record("bus-4", "174", -35.0, 138.55)
        };
        assert!(VehiclePosition::try_from(negative_speed).is_err());

        let unreported = VehiclePosition::try_from(record("bus-6", "174", -35.0, 138.55)).unwrap();
        assert_eq!(unreported.heading, None);

        let no_position = VehicleRecord {
            lat: None,
            ..record("bus-5", "174", -35.0, 138.55)
        };
        assert!(VehiclePosition::try_from(no_position).is_err());
    }

    #[test]
    fn test_record_accepts_feed_field_names() {
        let json = r#"{
            "id": "tram-7",
            "route_id": "GLNELG",
            "lat": -34.95,
            "lon": 138.58,
            "bearing": 725,
            "speed": 31.0,
            "arrival_minutes": 4,
            "occupancy": "FEW_SEATS_AVAILABLE"
        }"#;
        let record: VehicleRecord = serde_json::from_str(json).unwrap();
        let position = VehiclePosition::try_from(record).unwrap();

        assert_eq!(position.vehicle_id.as_str(), "tram-7");
        assert_eq!(position.heading, Some(5.0));
        assert_eq!(position.eta_minutes, Some(4));
        assert_eq!(position.occupancy, Some(Occupancy::FewSeatsAvailable));
    }

    #[test]
    fn test_store_replaces_whole_snapshot() {
        let store = SnapshotStore::new();
        assert!(store.current().is_empty());
        assert!(store.current().captured_at.is_none());

        let captured = Utc.with_ymd_and_hms(2025, 10, 15, 1, 15, 0).unwrap();
        let vehicles = vec![
            VehiclePosition::try_from(record("a", "174", -35.0, 138.55)).unwrap(),
            VehiclePosition::try_from(record("b", "H30", -34.9, 138.6)).unwrap(),
        ];

        let held = store.current();
        let previous = store.replace(VehicleSnapshot::new(vehicles, captured));
        assert!(previous.is_empty());

        // Readers holding the old snapshot keep seeing it whole
        assert!(held.is_empty());
        let current = store.current();
        assert_eq!(current.len(), 2);
        assert_eq!(current.captured_at, Some(captured));
        assert_eq!(current.on_route(&RouteIdentifier::new("174")).count(), 1);

        store.replace(VehicleSnapshot::empty());
        assert!(store.current().is_empty());
    }
}
