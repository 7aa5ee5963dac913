//! Request and response bodies for `/adelaide-metro/api`.
//!
//! Field names follow what the web client already reads, which is why
//! some responses are snake_case, some camelCase and `/nearby` abbreviates.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// A stop in a `/nearby` response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NearbyStop {
    /// Name
    pub n: String,
    /// Id
    pub i: String,
    pub lat: f64,
    pub lon: f64,
    /// Whole meters
    pub distance: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NearbyResponse {
    pub stops: Vec<NearbyStop>,
    pub center: Coordinates,
    pub radius: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StopsResponse {
    pub stops: Vec<Stop>,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClosestStopResponse {
    #[serde(flatten)]
    pub stop: Stop,
    /// Whole meters
    pub distance: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Stop ids in service order
    pub stops: Vec<String>,
    /// `[lat, lon]` pairs
    pub waypoints: Vec<[f64; 2]>,
    pub bidirectional: bool,
    pub destinations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutesResponse {
    pub routes: Vec<Route>,
    pub count: usize,
}

/// A live vehicle in a `/vehicles` response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub route_id: String,
    pub route_name: String,
    #[serde(rename = "type")]
    pub mode: String,
    pub lat: f64,
    pub lon: f64,
    pub bearing: f64,
    /// km/h, one decimal place
    pub speed: f64,
    pub timestamp: Option<i64>,
    pub trip_id: Option<String>,
    pub updated_at: Option<String>,
    pub destination: String,
    pub next_stop: String,
    pub arrival_minutes: Option<u32>,
    pub occupancy: Option<String>,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehiclesResponse {
    pub vehicles: Vec<Vehicle>,
    pub count: usize,
    pub source: String,
    pub updated_at: Option<String>,
}

/// A live vehicle due at a stop, in a `/stop/{id}/times` response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StopDeparture {
    pub route_id: String,
    pub route_name: String,
    #[serde(rename = "type")]
    pub mode: String,
    pub destination: String,
    pub vehicle_id: String,
    /// `HH:MM` Adelaide time, when the feed gives an ETA
    pub estimated_time: Option<String>,
    pub arrival_minutes: Option<u32>,
    pub occupancy: Option<String>,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StopTimesResponse {
    pub stop_id: String,
    pub stop_name: String,
    pub departures: Vec<StopDeparture>,
    pub updated_at: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub vehicles_cached: usize,
    pub last_update: Option<String>,
    pub source: String,
}

/// Body of `POST /plan` and `POST /trip-plan`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    /// `HH:MM`; defaults to now in Adelaide
    #[serde(default, alias = "time", alias = "departureTime")]
    pub departure_time: Option<String>,
    /// `YYYY-MM-DD`; defaults to today in Adelaide
    #[serde(default)]
    pub date: Option<String>,
    /// `regular` or `concession`
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveVehicle {
    pub vehicle_id: String,
    pub eta_minutes: Option<u32>,
    pub occupancy: Option<String>,
    pub speed_kmh: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    /// `walk` or `transit`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Route display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    /// Stop name
    pub from: String,
    /// Stop name
    pub to: String,
    pub from_id: String,
    pub to_id: String,
    /// `HH:MM`
    pub departure: String,
    /// `HH:MM`
    pub arrival: String,
    /// Minutes
    pub duration: u32,
    /// Whole meters
    pub distance: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stops: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live: Option<LiveVehicle>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    #[serde(rename = "type")]
    pub kind: String,
    /// Minutes
    pub total_time: u32,
    pub transfers: u32,
    /// Whole meters
    pub walking_distance: u64,
    /// Dollars
    pub fare: f64,
    pub fare_category: String,
    pub fare_period: String,
    pub legs: Vec<Leg>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    /// `ok`, `already_there` or `no_route_found`
    pub status: String,
    pub routes: Vec<Itinerary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_request_accepts_time_alias() {
        let request: PlanRequest =
            serde_json::from_str(r#"{"from": "a", "to": "b", "time": "11:45"}"#).unwrap();
        assert_eq!(request.departure_time.as_deref(), Some("11:45"));
        assert!(request.date.is_none());

        let empty: PlanRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, PlanRequest::default());
    }

    #[test]
    fn test_closest_stop_is_flat() {
        let response = ClosestStopResponse {
            stop: Stop {
                id: "c_victoria_sq".into(),
                name: "Victoria Square".into(),
                lat: -34.9285,
                lon: 138.598,
                mode: Some("tram".into()),
            },
            distance: 42,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["id"], "c_victoria_sq");
        assert_eq!(json["type"], "tram");
        assert_eq!(json["distance"], 42);
    }

    #[test]
    fn test_leg_field_names() {
        let leg = Leg {
            kind: "walk".into(),
            mode: None,
            route: None,
            route_id: None,
            from: "Goodwood Road".into(),
            to: "Goodwood Tram".into(),
            from_id: "s_goodwood_rd".into(),
            to_id: "t_goodwood_tram".into(),
            departure: "12:05".into(),
            arrival: "12:08".into(),
            duration: 3,
            distance: 228,
            stops: None,
            live: None,
        };
        let json = serde_json::to_value(&leg).unwrap();
        assert_eq!(json["type"], "walk");
        assert_eq!(json["fromId"], "s_goodwood_rd");
        assert!(json.get("mode").is_none());
        assert!(json.get("live").is_none());
    }
}
