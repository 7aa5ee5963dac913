//! JSON catalog loading.
//!
//! The catalog file lists stops and routes. Route stop lists may reference a
//! stop by id or by name; every reference is resolved here, so a dangling one
//! fails the load instead of surfacing during planning.

use std::collections::HashMap;
use std::path::Path;

use geo::{Coord, LineString, Point};
use serde::Deserialize;

use crate::identifiers::*;
use crate::models::types::*;
use crate::provider::static_provider::{RouteImpl, StaticTransitProvider, StopImpl};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFile {
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub service_area: Option<ServiceArea>,
    pub stops: Vec<StopRecord>,
    #[serde(default)]
    pub routes: Vec<RouteRecord>,
}

#[derive(Debug, Deserialize)]
pub struct StopRecord {
    /// Falls back to `name` when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, rename = "type")]
    pub mode: Option<RouteMode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(alias = "type")]
    pub mode: RouteMode,
    #[serde(default)]
    pub color: Option<String>,
    /// Stop ids or names, in service order
    pub stops: Vec<String>,
    /// (lat, lon) pairs
    #[serde(default)]
    pub waypoints: Vec<(f64, f64)>,
    #[serde(default)]
    pub average_speed_kmh: Option<f64>,
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default)]
    pub destinations: Vec<String>,
}

impl CatalogFile {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TransitError::DataLoad(e.to_string()))
    }

    pub fn into_provider(self) -> Result<StaticTransitProvider> {
        let stops = self
            .stops
            .into_iter()
            .map(StopRecord::into_stop)
            .collect::<Result<Vec<_>>>()?;

        let mut by_name: HashMap<String, StopIdentifier> = HashMap::new();
        for stop in &stops {
            by_name
                .entry(stop.name.to_lowercase())
                .or_insert_with(|| stop.id.clone());
        }
        let known: HashMap<&str, &StopIdentifier> =
            stops.iter().map(|s| (s.id.as_str(), &s.id)).collect();

        let mut routes = Vec::with_capacity(self.routes.len());
        for record in self.routes {
            let stop_ids = record
                .stops
                .iter()
                .map(|reference| {
                    known
                        .get(reference.as_str())
                        .map(|id| (*id).clone())
                        .or_else(|| by_name.get(&reference.to_lowercase()).cloned())
                        .ok_or_else(|| {
                            TransitError::DataLoad(format!(
                                "route {} references unknown stop {reference:?}",
                                record.id
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            routes.push(record.into_route(stop_ids)?);
        }

        let provider = StaticTransitProvider::from_data(stops, routes)?;
        tracing::info!(
            network = self.network.as_deref().unwrap_or("unnamed"),
            stops = provider.stop_count(),
            routes = provider.route_count(),
            "loaded catalog"
        );

        Ok(match self.service_area {
            Some(area) => provider.with_service_area(area),
            None => provider,
        })
    }
}

impl StopRecord {
    fn into_stop(self) -> Result<StopImpl> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(TransitError::DataLoad("stop with empty name".into()));
        }
        validate_coordinate(self.lat, self.lon)
            .map_err(|e| TransitError::DataLoad(format!("stop {name:?}: {e}")))?;

        let id = match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => name.to_string(),
        };

        Ok(StopImpl {
            id: StopIdentifier::new(id),
            name: name.into(),
            location: Point::new(self.lon, self.lat),
            mode: self.mode,
        })
    }
}

impl RouteRecord {
    fn into_route(self, stop_ids: Vec<StopIdentifier>) -> Result<RouteImpl> {
        if let Some(speed) = self.average_speed_kmh {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(TransitError::DataLoad(format!(
                    "route {} has invalid average speed {speed}",
                    self.id
                )));
            }
        }

        let mut coords = Vec::with_capacity(self.waypoints.len());
        for &(lat, lon) in &self.waypoints {
            validate_coordinate(lat, lon)
                .map_err(|e| TransitError::DataLoad(format!("route {} waypoint: {e}", self.id)))?;
            coords.push(Coord { x: lon, y: lat });
        }

        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Route {}", self.id));

        Ok(RouteImpl {
            id: RouteIdentifier::new(&self.id),
            name: name.into(),
            mode: self.mode,
            color: self.color.map(Into::into),
            stop_ids,
            waypoints: (!coords.is_empty()).then(|| LineString::new(coords)),
            average_speed_kmh: self.average_speed_kmh,
            bidirectional: self.bidirectional,
            destinations: self.destinations.into_iter().map(Into::into).collect(),
        })
    }
}

pub(crate) fn validate_coordinate(lat: f64, lon: f64) -> std::result::Result<(), String> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {lat} out of range"));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("longitude {lon} out of range"));
    }
    Ok(())
}

impl StaticTransitProvider {
    /// Load a catalog from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        CatalogFile::parse(json)?.into_provider()
    }

    /// Load a catalog from a JSON file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| TransitError::DataLoad(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }
}
