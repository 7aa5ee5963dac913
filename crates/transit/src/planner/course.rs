//! A route's stops laid out in one direction of travel.

use std::sync::Arc;

use crate::identifiers::*;
use crate::models::traits::*;
use crate::spatial::{bearing, haversine_distance};

/// One direction of a route with cumulative along-sequence distances
pub(crate) struct Course {
    pub route: Arc<dyn Route>,
    pub reversed: bool,
    pub stops: Vec<Arc<dyn TransitStop>>,
    cumulative: Vec<f64>,
}

impl Course {
    /// Every direction the route can be ridden in: listed order, plus the
    /// reverse for bidirectional routes
    pub fn all(provider: &dyn TransitProvider, route: &Arc<dyn Route>) -> Vec<Course> {
        let Some(stops) = route
            .stop_sequence()
            .iter()
            .map(|id| provider.get_stop(id))
            .collect::<Option<Vec<_>>>()
        else {
            tracing::warn!(route = %route.id(), "route references stops missing from the catalog");
            return Vec::new();
        };

        let mut courses = Vec::with_capacity(2);
        if route.bidirectional() && stops.len() > 1 {
            let mut reversed = stops.clone();
            reversed.reverse();
            courses.push(Course::new(route.clone(), false, stops));
            courses.push(Course::new(route.clone(), true, reversed));
        } else {
            courses.push(Course::new(route.clone(), false, stops));
        }
        courses
    }

    fn new(route: Arc<dyn Route>, reversed: bool, stops: Vec<Arc<dyn TransitStop>>) -> Self {
        let mut cumulative = Vec::with_capacity(stops.len());
        let mut total = 0.0;
        for (i, stop) in stops.iter().enumerate() {
            if i > 0 {
                total += haversine_distance(stops[i - 1].location(), stop.location());
            }
            cumulative.push(total);
        }

        Self {
            route,
            reversed,
            stops,
            cumulative,
        }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn position(&self, stop: &StopIdentifier) -> Option<usize> {
        self.stops.iter().position(|s| s.id() == stop)
    }

    /// First position of `stop` strictly after `after`
    pub fn position_after(&self, stop: &StopIdentifier, after: usize) -> Option<usize> {
        self.stops
            .iter()
            .enumerate()
            .skip(after + 1)
            .find(|(_, s)| s.id() == stop)
            .map(|(i, _)| i)
    }

    /// Along-sequence distance between two positions, `from <= to`
    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.cumulative[to] - self.cumulative[from]
    }

    /// Board at `from`, alight at `to`: the positions if `to` follows `from`
    pub fn ride(&self, from: &StopIdentifier, to: &StopIdentifier) -> Option<(usize, usize)> {
        let board = self.position(from)?;
        let alight = self.position_after(to, board)?;
        Some((board, alight))
    }

    /// Direction of travel on the way into `position`. The first stop takes
    /// the bearing of the segment leaving it.
    pub fn bearing_into(&self, position: usize) -> Option<f64> {
        if self.stops.len() < 2 || position >= self.stops.len() {
            return None;
        }
        let (from, to) = if position == 0 { (0, 1) } else { (position - 1, position) };
        Some(bearing(self.stops[from].location(), self.stops[to].location()))
    }

    pub fn ride_minutes(&self, from: usize, to: usize) -> u32 {
        ride_minutes(self.distance(from, to), self.route.average_speed_kmh())
    }
}

/// Whole minutes to cover `distance_m` at `speed_kmh`, at least one
pub fn ride_minutes(distance_m: f64, speed_kmh: f64) -> u32 {
    if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
        return 1;
    }
    let minutes = distance_m / 1000.0 / speed_kmh * 60.0;
    minutes.round().max(1.0) as u32
}

/// Whole minutes to walk `distance_m`, rounded up
pub fn walk_minutes(distance_m: f64, speed_mps: f64) -> u32 {
    if distance_m <= 0.0 {
        return 0;
    }
    (distance_m / speed_mps / 60.0).ceil().max(1.0) as u32
}
