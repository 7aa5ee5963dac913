//! Attach live vehicle data to planned legs.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::identifiers::*;
use crate::live::snapshot::{Occupancy, VehiclePosition, VehicleSnapshot};
use crate::models::traits::*;
use crate::planner::{Course, Itinerary, Leg, LegKind};
use crate::spatial::bearing_difference;

/// Live data for the vehicle a rider would catch on a leg
#[derive(Clone, Debug, PartialEq)]
pub struct LiveOverlay {
    pub vehicle_id: VehicleIdentifier,
    pub eta_minutes: Option<u32>,
    pub occupancy: Option<Occupancy>,
    pub speed_kmh: f64,
}

impl From<&VehiclePosition> for LiveOverlay {
    fn from(vehicle: &VehiclePosition) -> Self {
        Self {
            vehicle_id: vehicle.vehicle_id.clone(),
            eta_minutes: vehicle.eta_minutes,
            occupancy: vehicle.occupancy,
            speed_kmh: vehicle.speed_kmh,
        }
    }
}

/// Soonest ETA first, unknown ETAs last, then by vehicle id
fn by_eta(a: &VehiclePosition, b: &VehiclePosition) -> Ordering {
    match (a.eta_minutes, b.eta_minutes) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.vehicle_id.cmp(&b.vehicle_id))
}

/// Largest difference between a vehicle's heading and the course bearing
/// at its next stop for it to count as running that way
const MAX_HEADING_DIFFERENCE: f64 = 90.0;

/// Whether `vehicle` still has to reach position `board` on `course`.
///
/// On a bidirectional route the same next stop appears on both courses, so
/// a reported heading has to agree with the course as well.
fn approaching(course: &Course, board: usize, vehicle: &VehiclePosition) -> bool {
    let Some(position) = vehicle.next_stop.as_ref().and_then(|stop| course.position(stop)) else {
        return false;
    };
    if position > board {
        return false;
    }
    if !course.route.bidirectional() {
        return true;
    }
    match (vehicle.heading, course.bearing_into(position)) {
        (Some(heading), Some(bearing)) => bearing_difference(heading, bearing) <= MAX_HEADING_DIFFERENCE,
        _ => true,
    }
}

/// A vehicle on its way to a stop
#[derive(Clone, Debug, PartialEq)]
pub struct Departure {
    pub vehicle: VehiclePosition,
    /// Last stop in the direction the vehicle is running
    pub headsign: Arc<str>,
}

#[derive(Clone)]
pub struct LiveMatcher {
    provider: Arc<dyn TransitProvider>,
}

impl LiveMatcher {
    pub fn new(provider: Arc<dyn TransitProvider>) -> Self {
        Self { provider }
    }

    /// The vehicle a rider boarding this leg would catch.
    ///
    /// A vehicle qualifies when it runs the leg's route and its next stop is
    /// at or before the boarding stop in the leg's direction of travel.
    pub fn match_leg<'a>(&self, leg: &Leg, snapshot: &'a VehicleSnapshot) -> Option<&'a VehiclePosition> {
        if leg.kind != LegKind::Transit || snapshot.is_empty() {
            return None;
        }
        let route_id = leg.route_id.as_ref()?;
        let route = self.provider.get_route(route_id)?;

        let (course, board) = Course::all(self.provider.as_ref(), &route)
            .into_iter()
            .find_map(|course| {
                let (board, _) = course.ride(&leg.from_stop, &leg.to_stop)?;
                Some((course, board))
            })?;

        snapshot
            .on_route(route_id)
            .filter(|vehicle| approaching(&course, board, vehicle))
            .min_by(|a, b| by_eta(a, b))
    }

    /// Vehicles that will still call at `stop` and carry on from it, soonest
    /// first. Each vehicle is listed once.
    pub fn departures(&self, stop: &StopIdentifier, snapshot: &VehicleSnapshot) -> Vec<Departure> {
        if snapshot.is_empty() {
            return Vec::new();
        }

        let mut departures: Vec<Departure> = Vec::new();
        for route in self.provider.routes_serving(stop) {
            for course in Course::all(self.provider.as_ref(), &route) {
                let Some(board) = course.position(stop) else {
                    continue;
                };
                // Terminating here is an arrival, not a departure
                if board + 1 >= course.len() {
                    continue;
                }
                let headsign: Arc<str> = course.stops[course.len() - 1].name().into();

                for vehicle in snapshot.on_route(route.id()) {
                    if approaching(&course, board, vehicle)
                        && !departures.iter().any(|d| d.vehicle.vehicle_id == vehicle.vehicle_id)
                    {
                        departures.push(Departure {
                            vehicle: vehicle.clone(),
                            headsign: headsign.clone(),
                        });
                    }
                }
            }
        }

        departures.sort_by(|a, b| by_eta(&a.vehicle, &b.vehicle));
        departures
    }

    /// Set the live overlay on every transit leg that has a matching
    /// vehicle. Static times are left alone.
    pub fn enrich(&self, itinerary: &mut Itinerary, snapshot: &VehicleSnapshot) {
        for leg in &mut itinerary.legs {
            leg.live = self.match_leg(leg, snapshot).map(LiveOverlay::from);
        }
    }

    pub fn enrich_all(&self, itineraries: &mut [Itinerary], snapshot: &VehicleSnapshot) {
        if snapshot.is_empty() {
            return;
        }
        let mut matched = 0usize;
        for itinerary in itineraries.iter_mut() {
            self.enrich(itinerary, snapshot);
            matched += itinerary.legs.iter().filter(|leg| leg.live.is_some()).count();
        }
        tracing::debug!(matched, vehicles = snapshot.len(), "matched live vehicles");
    }
}
