//! Core data types and enums for transit data.

use serde::{Deserialize, Serialize};

use crate::identifiers::*;

// ============================================================================
// Enums
// ============================================================================

/// Vehicle mode a route is operated with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    Bus,
    Train,
    Tram,
}

/// Train route ids and short codes as they appear in the realtime feed
const TRAIN_ROUTE_IDS: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7",
    "Belair", "Gawler", "Seaford", "Flinders", "Outer Harbor", "Grange", "Tonsley",
    "BEL", "GAWC", "GAW", "SEAFRD", "FLNDRS", "OUTHA", "PTDOCK", "GRNG", "TONSL",
];

const TRAIN_ROUTE_PREFIXES: &[&str] = &["1:", "2:", "3:", "4:", "5:", "6:", "7:"];

const TRAM_ROUTE_IDS: &[&str] = &[
    "Glenelg", "Botanic", "glenelg", "botanic",
    "GLNELG", "BTANIC", "FESTVL",
];

impl RouteMode {
    /// Map a GTFS `route_type` onto the modes this network runs
    pub fn from_gtfs(value: u16) -> Option<Self> {
        match value {
            0 | 5 => Some(Self::Tram),
            1 | 2 => Some(Self::Train),
            3 | 700..=799 => Some(Self::Bus),
            100..=199 => Some(Self::Train),
            900..=999 => Some(Self::Tram),
            _ => None,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bus" | "buses" => Some(Self::Bus),
            "train" | "trains" | "rail" => Some(Self::Train),
            "tram" | "trams" => Some(Self::Tram),
            _ => None,
        }
    }

    /// Classify a realtime feed route id that may not be in the catalog.
    ///
    /// Anything not recognised as a train or tram line is a bus.
    pub fn infer_from_route_id(route_id: &str) -> Self {
        if TRAIN_ROUTE_IDS.contains(&route_id)
            || TRAIN_ROUTE_PREFIXES.iter().any(|p| route_id.starts_with(p))
        {
            Self::Train
        } else if TRAM_ROUTE_IDS.contains(&route_id) {
            Self::Tram
        } else {
            Self::Bus
        }
    }

    /// Nominal average running speed used when a route carries none
    pub fn default_speed_kmh(self) -> f64 {
        match self {
            Self::Bus => 30.0,
            Self::Train => 50.0,
            Self::Tram => 25.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bus => "bus",
            Self::Train => "train",
            Self::Tram => "tram",
        }
    }
}

/// Rider-facing line name for a realtime feed route id
pub fn feed_route_name(route_id: &str) -> Option<&'static str> {
    let name = match route_id {
        "1" | "Belair" | "BEL" => "Belair",
        "2" | "Gawler" | "GAWC" => "Gawler Central",
        "GAW" => "Gawler",
        "3" | "Seaford" | "SEAFRD" => "Seaford",
        "4" | "Flinders" | "FLNDRS" => "Flinders",
        "5" | "Outer Harbor" | "OUTHA" => "Outer Harbor",
        "PTDOCK" => "Port Dock",
        "6" | "Grange" | "GRNG" => "Grange",
        "7" | "Tonsley" | "TONSL" => "Tonsley",
        "Glenelg" | "GLNELG" => "Glenelg Tram",
        "Botanic" | "BTANIC" => "Botanic Tram",
        "FESTVL" => "Entertainment Centre",
        _ => return None,
    };
    Some(name)
}

/// Terminus a realtime feed route id runs out to
pub fn feed_route_destination(route_id: &str) -> Option<&'static str> {
    let destination = match route_id {
        "1" | "Belair" | "BEL" => "Belair",
        "2" | "Gawler" | "GAWC" => "Gawler Central",
        "GAW" => "Gawler",
        "3" | "Seaford" | "SEAFRD" => "Seaford",
        "4" | "Flinders" | "FLNDRS" => "Flinders",
        "5" | "Outer Harbor" | "OUTHA" => "Outer Harbor",
        "PTDOCK" => "Port Dock",
        "6" | "Grange" | "GRNG" => "Grange",
        "7" | "Tonsley" | "TONSL" => "Tonsley",
        "Glenelg" | "GLNELG" => "Glenelg",
        "Botanic" | "BTANIC" => "Botanic Gardens",
        "FESTVL" => "Entertainment Centre",
        _ => return None,
    };
    Some(destination)
}

// ============================================================================
// Data Structures
// ============================================================================

/// Latitude/longitude box a network operates in.
///
/// Vehicle reports outside it are treated as bad fixes and dropped.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceArea {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl ServiceArea {
    /// Greater Adelaide, Gawler to Aldinga and Outer Harbor to Mount Barker
    pub const ADELAIDE: Self = Self {
        min_lat: -35.25,
        max_lat: -34.55,
        min_lon: 138.40,
        max_lon: 138.80,
    };

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Stop not found: {0}")]
    StopNotFound(String),

    #[error("Route not found: {0}")]
    RouteNotFound(RouteIdentifier),

    #[error("Failed to load catalog: {0}")]
    DataLoad(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, TransitError>;
