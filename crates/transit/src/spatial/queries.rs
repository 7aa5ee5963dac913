//! Spatial query utilities for distance calculations.
//!
//! Uses Haversine formula for accurate distances on Earth's surface.

use geo::{HaversineBearing, HaversineDistance, Point};

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Calculate Haversine distance between two points in meters
pub fn haversine_distance(p1: Point, p2: Point) -> f64 {
    p1.haversine_distance(&p2)
}

/// Total haversine length of a path through `points`, in meters
pub fn path_length(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_distance(pair[0], pair[1]))
        .sum()
}

/// Initial bearing from `from` to `to`, degrees clockwise from north in `[0, 360)`
pub fn bearing(from: Point, to: Point) -> f64 {
    from.haversine_bearing(to).rem_euclid(360.0)
}

/// Smallest angle between two bearings, in `[0, 180]`
pub fn bearing_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}

/// Convert meters to degrees at equator (for bounding box queries)
pub fn meters_to_degrees_approx(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Search radius in degrees that covers `meters` around `latitude`.
///
/// A degree of longitude shrinks with latitude, so the equatorial
/// conversion is widened by 1/cos(lat) to stay an upper bound.
pub fn search_radius_degrees(meters: f64, latitude: f64) -> f64 {
    let shrink = latitude.to_radians().cos().abs().max(0.01);
    meters_to_degrees_approx(meters) / shrink * 1.01
}
