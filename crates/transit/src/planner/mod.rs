//! Itinerary planning over the static catalog.
//!
//! Plans are either a single ride on one route or two rides joined at a
//! transfer, optionally with a short walk between the transfer stops. Ride
//! times come from along-sequence distance and route running speed; there
//! are no timetables.

mod course;
pub mod itinerary;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDateTime};

use crate::identifiers::*;
use crate::models::fares::{Fare, FareCategory, FareSchedule};
use crate::models::traits::*;
use crate::models::types::*;
use crate::spatial::haversine_distance;

pub(crate) use course::Course;
pub use course::{ride_minutes, walk_minutes};
pub use itinerary::{Itinerary, Leg, LegKind};
use itinerary::ItineraryBuilder;

/// Planner tunables
#[derive(Clone, Debug, PartialEq)]
pub struct PlannerConfig {
    pub max_itineraries: usize,
    /// Wait added before every boarding after the first
    pub transfer_wait_minutes: u32,
    /// Furthest a rider is asked to walk between two transfer stops
    pub max_transfer_walk_m: f64,
    pub walking_speed_mps: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_itineraries: 3,
            transfer_wait_minutes: 5,
            max_transfer_walk_m: 300.0,
            walking_speed_mps: 1.4,
        }
    }
}

/// A request to get from one stop to another
#[derive(Clone, Debug, PartialEq)]
pub struct TripQuery {
    /// Stop id or name
    pub origin: String,
    /// Stop id or name
    pub destination: String,
    pub departure: NaiveDateTime,
    pub category: FareCategory,
}

impl TripQuery {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>, departure: NaiveDateTime) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            departure,
            category: FareCategory::Regular,
        }
    }

    pub fn with_category(mut self, category: FareCategory) -> Self {
        self.category = category;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlanOutcome {
    /// Best first, never empty
    Itineraries(Vec<Itinerary>),
    /// Origin and destination are the same stop
    AlreadyThere(Itinerary),
    /// Both stops exist but no route or single transfer joins them
    NoRouteFound,
}

impl PlanOutcome {
    pub fn itineraries(&self) -> &[Itinerary] {
        match self {
            Self::Itineraries(itineraries) => itineraries,
            Self::AlreadyThere(itinerary) => std::slice::from_ref(itinerary),
            Self::NoRouteFound => &[],
        }
    }

    pub fn itineraries_mut(&mut self) -> &mut [Itinerary] {
        match self {
            Self::Itineraries(itineraries) => itineraries,
            Self::AlreadyThere(itinerary) => std::slice::from_mut(itinerary),
            Self::NoRouteFound => &mut [],
        }
    }

    pub fn into_itineraries(self) -> Vec<Itinerary> {
        match self {
            Self::Itineraries(itineraries) => itineraries,
            Self::AlreadyThere(itinerary) => vec![itinerary],
            Self::NoRouteFound => Vec::new(),
        }
    }

    pub fn is_no_route(&self) -> bool {
        matches!(self, Self::NoRouteFound)
    }
}

/// Best pairing found so far for one (first route, second route) pair
struct Transfer {
    board: usize,
    alight: usize,
    reboard: usize,
    destination: usize,
    walk_m: f64,
    total: u32,
}

/// Stateless planner over a shared catalog
#[derive(Clone)]
pub struct TripPlanner {
    provider: Arc<dyn TransitProvider>,
    config: PlannerConfig,
    fares: FareSchedule,
}

impl TripPlanner {
    pub fn new(provider: Arc<dyn TransitProvider>) -> Self {
        Self::with_config(provider, PlannerConfig::default(), FareSchedule::default())
    }

    pub fn with_config(
        provider: Arc<dyn TransitProvider>,
        config: PlannerConfig,
        fares: FareSchedule,
    ) -> Self {
        Self {
            provider,
            config,
            fares,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn fares(&self) -> &FareSchedule {
        &self.fares
    }

    /// Plan a trip.
    ///
    /// Fails only when a stop reference does not resolve. Finding nothing
    /// is [`PlanOutcome::NoRouteFound`].
    pub fn plan(&self, query: &TripQuery) -> Result<PlanOutcome> {
        let origin = self
            .provider
            .resolve_stop(&query.origin)
            .ok_or_else(|| TransitError::StopNotFound(query.origin.clone()))?;
        let destination = self
            .provider
            .resolve_stop(&query.destination)
            .ok_or_else(|| TransitError::StopNotFound(query.destination.clone()))?;

        let fare = self.fares.fare(
            query.departure.time(),
            query.departure.weekday(),
            query.category,
        );

        if origin.id() == destination.id() {
            return Ok(PlanOutcome::AlreadyThere(Itinerary::stationary(fare)));
        }

        let origin_courses = self.courses_serving(origin.id());
        let destination_courses = self.courses_serving(destination.id());

        let mut candidates = self.direct(&origin_courses, origin.id(), destination.id(), query.departure, fare);
        candidates.extend(self.one_transfer(
            &origin_courses,
            &destination_courses,
            origin.id(),
            destination.id(),
            query.departure,
            fare,
        ));

        tracing::debug!(
            origin = %origin.id(),
            destination = %destination.id(),
            candidates = candidates.len(),
            "planned trip"
        );

        let ranked = self.rank(candidates);
        if ranked.is_empty() {
            Ok(PlanOutcome::NoRouteFound)
        } else {
            Ok(PlanOutcome::Itineraries(ranked))
        }
    }

    fn courses_serving(&self, stop: &StopIdentifier) -> Vec<Course> {
        self.provider
            .routes_serving(stop)
            .iter()
            .flat_map(|route| Course::all(self.provider.as_ref(), route))
            .collect()
    }

    fn direct(
        &self,
        courses: &[Course],
        origin: &StopIdentifier,
        destination: &StopIdentifier,
        departure: NaiveDateTime,
        fare: Fare,
    ) -> Vec<Itinerary> {
        courses
            .iter()
            .filter_map(|course| {
                let (board, alight) = course.ride(origin, destination)?;
                let mut builder = ItineraryBuilder::new(departure);
                self.ride(&mut builder, course, board, alight);
                Some(builder.finish(fare))
            })
            .collect()
    }

    fn one_transfer(
        &self,
        first_courses: &[Course],
        second_courses: &[Course],
        origin: &StopIdentifier,
        destination: &StopIdentifier,
        departure: NaiveDateTime,
        fare: Fare,
    ) -> Vec<Itinerary> {
        let mut itineraries = Vec::new();

        for first in first_courses {
            let Some(board) = first.position(origin) else {
                continue;
            };

            for second in second_courses {
                if first.route.id() == second.route.id() {
                    continue;
                }
                let Some(end) = second.position(destination) else {
                    continue;
                };

                if let Some(best) = self.best_transfer(first, second, board, end, origin, destination) {
                    let mut builder = ItineraryBuilder::new(departure);
                    self.ride(&mut builder, first, best.board, best.alight);

                    let alight_stop = &first.stops[best.alight];
                    let reboard_stop = &second.stops[best.reboard];
                    if alight_stop.id() != reboard_stop.id() {
                        builder.walk(
                            alight_stop.as_ref(),
                            reboard_stop.as_ref(),
                            best.walk_m,
                            walk_minutes(best.walk_m, self.config.walking_speed_mps),
                        );
                    }

                    builder.wait(self.config.transfer_wait_minutes);
                    self.ride(&mut builder, second, best.reboard, best.destination);

                    debug_assert_eq!(builder.elapsed(), best.total);
                    itineraries.push(builder.finish(fare));
                }
            }
        }

        itineraries
    }

    /// Quickest way to change from `first` onto `second`, preferring less
    /// walking when two pairings take the same time
    fn best_transfer(
        &self,
        first: &Course,
        second: &Course,
        board: usize,
        end: usize,
        origin: &StopIdentifier,
        destination: &StopIdentifier,
    ) -> Option<Transfer> {
        let mut best: Option<Transfer> = None;

        // Neither ride may pass through the stop the trip starts or ends at
        let last = first.position_after(destination, board).unwrap_or(first.len());
        let start = second.stops[..end]
            .iter()
            .rposition(|s| s.id() == origin)
            .map_or(0, |i| i + 1);

        for alight in board + 1..last {
            let alight_stop = &first.stops[alight];
            let first_minutes = first.ride_minutes(board, alight);

            for reboard in start..end {
                let reboard_stop = &second.stops[reboard];

                let walk_m = if alight_stop.id() == reboard_stop.id() {
                    0.0
                } else {
                    let distance = haversine_distance(alight_stop.location(), reboard_stop.location());
                    if distance > self.config.max_transfer_walk_m {
                        continue;
                    }
                    distance
                };

                let total = first_minutes
                    + walk_minutes(walk_m, self.config.walking_speed_mps)
                    + self.config.transfer_wait_minutes
                    + second.ride_minutes(reboard, end);

                let better = match &best {
                    None => true,
                    Some(current) => {
                        (total, walk_m).partial_cmp(&(current.total, current.walk_m))
                            == Some(std::cmp::Ordering::Less)
                    }
                };
                if better {
                    best = Some(Transfer {
                        board,
                        alight,
                        reboard,
                        destination: end,
                        walk_m,
                        total,
                    });
                }
            }
        }

        best
    }

    fn ride(&self, builder: &mut ItineraryBuilder, course: &Course, board: usize, alight: usize) {
        builder.transit(
            course.route.as_ref(),
            course.stops[board].as_ref(),
            course.stops[alight].as_ref(),
            course.distance(board, alight),
            (alight - board) as u32,
            course.ride_minutes(board, alight),
        );
    }

    /// Best first, duplicates dropped, at most `max_itineraries`
    fn rank(&self, mut candidates: Vec<Itinerary>) -> Vec<Itinerary> {
        candidates.sort_by(|a, b| {
            a.total_time_minutes
                .cmp(&b.total_time_minutes)
                .then(a.transfer_count.cmp(&b.transfer_count))
                .then(a.walking_distance_m.total_cmp(&b.walking_distance_m))
                .then_with(|| route_ids(a).cmp(&route_ids(b)))
        });

        let mut seen = HashSet::new();
        candidates.retain(|itinerary| seen.insert(itinerary.signature()));
        candidates.truncate(self.config.max_itineraries.max(1));
        candidates
    }
}

fn route_ids(itinerary: &Itinerary) -> Vec<&RouteIdentifier> {
    itinerary
        .legs
        .iter()
        .filter_map(|leg| leg.route_id.as_ref())
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::fares::FarePeriod;
    use crate::provider::static_provider::tests::{route, stop};
    use crate::provider::StaticTransitProvider;
    use chrono::NaiveDate;

    /// Wednesday 15 October 2025
    pub(crate) fn weekday_at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    /// Southern suburbs to the city, plus a tram and a disconnected stop
    pub(crate) fn fixture() -> StaticTransitProvider {
        let stops = vec![
            stop("s_pimpala_45", "Stop 45 Pimpala Rd", -35.092, 138.553),
            stop("s_marion", "Westfield Marion", -35.015, 138.54),
            stop("s_goodwood_rd", "Goodwood Road", -34.955, 138.595),
            stop("c_victoria_sq", "Victoria Square", -34.9285, 138.598),
            stop("c_adelaide_station", "Adelaide Railway Station", -34.921115, 138.595834),
            // A short walk from the 174 stop at Goodwood Road
            stop("t_goodwood_tram", "Goodwood Tram", -34.9550, 138.5975),
            stop("t_glenelg", "Moseley Square", -34.9807, 138.512),
            stop("t_south_tce", "South Terrace", -34.9400, 138.5990),
            stop("h_hallett_cove", "Hallett Cove Beach", -35.08, 138.50),
        ];

        let mut bus = route(
            "174",
            RouteMode::Bus,
            &[
                "s_pimpala_45",
                "s_marion",
                "s_goodwood_rd",
                "c_victoria_sq",
                "c_adelaide_station",
            ],
        );
        bus.average_speed_kmh = Some(50.0);

        let mut tram = route(
            "GLNELG",
            RouteMode::Tram,
            &["t_glenelg", "t_goodwood_tram", "t_south_tce", "c_victoria_sq"],
        );
        tram.bidirectional = true;

        StaticTransitProvider::from_data(stops, vec![bus, tram]).unwrap()
    }

    fn planner() -> TripPlanner {
        TripPlanner::new(Arc::new(fixture()))
    }

    #[test]
    fn test_pimpala_to_city_direct_bus() {
        let query = TripQuery::new("Stop 45 Pimpala Rd", "Adelaide Railway Station", weekday_at(11, 45));
        let outcome = planner().plan(&query).unwrap();

        let best = &outcome.itineraries()[0];
        assert_eq!(best.transfer_count, 0);
        assert_eq!(best.legs.len(), 1);
        assert_eq!(best.legs[0].route_id.as_ref().map(|r| r.as_str()), Some("174"));
        assert_eq!(best.total_time_minutes, 25);
        assert_eq!(best.fare.cents, 260);
        assert_eq!(best.fare.period, FarePeriod::OffPeak);
        assert_eq!(best.legs[0].stop_count, 4);
        assert_eq!(best.legs[0].arrival, weekday_at(12, 10));

        let concession = planner()
            .plan(&query.clone().with_category(FareCategory::Concession))
            .unwrap();
        assert_eq!(concession.itineraries()[0].fare.cents, 130);
    }

    #[test]
    fn test_one_way_route_is_not_ridden_backwards() {
        let query = TripQuery::new("c_adelaide_station", "s_pimpala_45", weekday_at(8, 0));
        assert_eq!(planner().plan(&query).unwrap(), PlanOutcome::NoRouteFound);
    }

    #[test]
    fn test_bidirectional_route_runs_both_ways() {
        let out = planner()
            .plan(&TripQuery::new("t_glenelg", "t_south_tce", weekday_at(8, 0)))
            .unwrap();
        let back = planner()
            .plan(&TripQuery::new("t_south_tce", "t_glenelg", weekday_at(8, 0)))
            .unwrap();

        assert_eq!(out.itineraries()[0].transfer_count, 0);
        assert_eq!(back.itineraries()[0].transfer_count, 0);
        assert_eq!(
            out.itineraries()[0].total_time_minutes,
            back.itineraries()[0].total_time_minutes
        );
    }

    #[test]
    fn test_transfer_at_shared_stop() {
        // 174 to Victoria Square, then the tram back out to South Terrace
        let outcome = planner()
            .plan(&TripQuery::new("s_marion", "t_south_tce", weekday_at(10, 0)))
            .unwrap();

        let shared = outcome
            .itineraries()
            .iter()
            .find(|i| i.legs.iter().all(|leg| leg.kind == LegKind::Transit))
            .unwrap();
        assert_eq!(shared.transfer_count, 1);
        assert_eq!(shared.legs[0].to_stop.as_str(), "c_victoria_sq");
        assert_eq!(shared.legs[1].from_stop.as_str(), "c_victoria_sq");
        assert_eq!(shared.wait_minutes(), 5);
    }

    #[test]
    fn test_transfer_with_walk_leg() {
        let outcome = planner()
            .plan(&TripQuery::new("s_pimpala_45", "t_glenelg", weekday_at(10, 0)))
            .unwrap();

        let best = &outcome.itineraries()[0];
        let kinds: Vec<LegKind> = best.legs.iter().map(|leg| leg.kind).collect();
        assert_eq!(kinds, vec![LegKind::Transit, LegKind::Walk, LegKind::Transit]);
        assert_eq!(best.legs[0].to_stop.as_str(), "s_goodwood_rd");
        assert_eq!(best.legs[2].from_stop.as_str(), "t_goodwood_tram");
        assert!(best.walking_distance_m > 0.0 && best.walking_distance_m <= 300.0);
        assert_eq!(best.transfer_count, 1);
    }

    #[test]
    fn test_every_itinerary_is_contiguous_and_timed() {
        let planner = planner();
        let stops = ["s_pimpala_45", "s_marion", "c_victoria_sq", "t_glenelg", "t_south_tce"];
        for from in stops {
            for to in stops {
                let outcome = planner.plan(&TripQuery::new(from, to, weekday_at(17, 30))).unwrap();
                for itinerary in outcome.itineraries() {
                    assert!(itinerary.is_contiguous(), "{from} -> {to}");
                    assert!(itinerary.total_time_minutes >= itinerary.leg_minutes());
                    assert!(itinerary.legs.len() <= 3);
                }
                assert!(outcome.itineraries().len() <= 3);
            }
        }
    }

    #[test]
    fn test_shared_route_always_gives_direct_option() {
        let outcome = planner()
            .plan(&TripQuery::new("s_marion", "c_victoria_sq", weekday_at(7, 0)))
            .unwrap();
        assert!(outcome.itineraries().iter().any(|i| i.transfer_count == 0));
    }

    #[test]
    fn test_same_stop_is_already_there() {
        let outcome = planner()
            .plan(&TripQuery::new("Victoria Square", "c_victoria_sq", weekday_at(7, 0)))
            .unwrap();

        let PlanOutcome::AlreadyThere(itinerary) = outcome else {
            panic!("expected AlreadyThere");
        };
        assert!(itinerary.legs.is_empty());
        assert_eq!(itinerary.total_time_minutes, 0);
        // Peak fare before 9am
        assert_eq!(itinerary.fare.cents, 400);
    }

    #[test]
    fn test_disconnected_stops() {
        let outcome = planner()
            .plan(&TripQuery::new("h_hallett_cove", "c_adelaide_station", weekday_at(7, 0)))
            .unwrap();
        assert!(outcome.is_no_route());
        assert!(outcome.itineraries().is_empty());
    }

    #[test]
    fn test_unknown_stop_is_error() {
        let err = planner()
            .plan(&TripQuery::new("Nowhere", "c_adelaide_station", weekday_at(7, 0)))
            .unwrap_err();
        assert!(matches!(err, TransitError::StopNotFound(ref r) if r == "Nowhere"));
    }

    #[test]
    fn test_plans_are_idempotent() {
        let planner = planner();
        let query = TripQuery::new("s_pimpala_45", "t_glenelg", weekday_at(12, 0));
        assert_eq!(planner.plan(&query).unwrap(), planner.plan(&query).unwrap());
    }

    #[test]
    fn test_transfer_never_rides_past_destination() {
        // A runs on past D to Y, where B turns back towards D
        let stops = vec![
            stop("o", "Origin", -34.95, 138.60),
            stop("x", "Middle", -34.94, 138.60),
            stop("d", "Destination", -34.93, 138.60),
            stop("y", "Beyond", -34.92, 138.60),
        ];
        let routes = vec![
            route("A", RouteMode::Bus, &["o", "x", "d", "y"]),
            route("B", RouteMode::Bus, &["y", "d"]),
        ];
        let provider = StaticTransitProvider::from_data(stops, routes).unwrap();
        let planner = TripPlanner::new(Arc::new(provider));

        let outcome = planner.plan(&TripQuery::new("o", "d", weekday_at(10, 0))).unwrap();
        assert_eq!(outcome.itineraries().len(), 1);
        for itinerary in outcome.itineraries() {
            let through: Vec<&str> = itinerary.legs[..itinerary.legs.len() - 1]
                .iter()
                .map(|leg| leg.to_stop.as_str())
                .collect();
            assert!(!through.contains(&"d"), "{through:?}");
        }
        assert_eq!(outcome.itineraries()[0].transfer_count, 0);
    }

    #[test]
    fn test_transfer_never_rides_back_through_origin() {
        // B passes the origin again on its way to D
        let stops = vec![
            stop("o", "Origin", -34.95, 138.60),
            stop("x", "Out", -34.96, 138.60),
            stop("d", "Destination", -34.93, 138.60),
        ];
        let routes = vec![
            route("A", RouteMode::Bus, &["o", "x"]),
            route("B", RouteMode::Bus, &["x", "o", "d"]),
        ];
        let provider = StaticTransitProvider::from_data(stops, routes).unwrap();
        let planner = TripPlanner::new(Arc::new(provider));

        let outcome = planner.plan(&TripQuery::new("o", "d", weekday_at(10, 0))).unwrap();
        assert_eq!(outcome.itineraries().len(), 1);
        assert_eq!(outcome.itineraries()[0].transfer_count, 0);
        assert_eq!(outcome.itineraries()[0].legs[0].from_stop.as_str(), "o");
    }

    #[test]
    fn test_max_itineraries() {
        let config = PlannerConfig {
            max_itineraries: 1,
            ..PlannerConfig::default()
        };
        let planner = TripPlanner::with_config(Arc::new(fixture()), config, FareSchedule::default());
        let outcome = planner
            .plan(&TripQuery::new("s_marion", "t_south_tce", weekday_at(10, 0)))
            .unwrap();
        assert_eq!(outcome.itineraries().len(), 1);
    }
}
