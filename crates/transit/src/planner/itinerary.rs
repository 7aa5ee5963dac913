//! Itineraries and their legs.
//!
//! These are per-request values: built by the planner, optionally enriched
//! by the live matcher, serialized, then dropped.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use crate::identifiers::*;
use crate::live::LiveOverlay;
use crate::models::fares::Fare;
use crate::models::traits::{Route, TransitStop};
use crate::models::types::RouteMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegKind {
    Walk,
    Transit,
}

impl LegKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Walk => "walk",
            Self::Transit => "transit",
        }
    }
}

/// One contiguous segment of an itinerary
#[derive(Clone, Debug, PartialEq)]
pub struct Leg {
    pub kind: LegKind,
    pub mode: Option<RouteMode>,
    pub route_id: Option<RouteIdentifier>,
    pub route_name: Option<Arc<str>>,
    pub from_stop: StopIdentifier,
    pub from_name: Arc<str>,
    pub to_stop: StopIdentifier,
    pub to_name: Arc<str>,
    pub departure: NaiveDateTime,
    /// Static estimate; live data never overwrites it
    pub arrival: NaiveDateTime,
    pub duration_minutes: u32,
    pub distance_m: f64,
    /// Stops travelled past, including the alighting stop
    pub stop_count: u32,
    pub live: Option<LiveOverlay>,
}

/// A complete proposed journey
#[derive(Clone, Debug, PartialEq)]
pub struct Itinerary {
    pub legs: Vec<Leg>,
    pub total_time_minutes: u32,
    pub transfer_count: u32,
    pub walking_distance_m: f64,
    pub fare: Fare,
}

impl Itinerary {
    /// The "already there" itinerary: no legs, no time
    pub fn stationary(fare: Fare) -> Self {
        Self {
            legs: Vec::new(),
            total_time_minutes: 0,
            transfer_count: 0,
            walking_distance_m: 0.0,
            fare,
        }
    }

    pub fn leg_minutes(&self) -> u32 {
        self.legs.iter().map(|leg| leg.duration_minutes).sum()
    }

    /// Minutes spent waiting between legs
    pub fn wait_minutes(&self) -> u32 {
        self.total_time_minutes.saturating_sub(self.leg_minutes())
    }

    /// `leg[i].to_stop == leg[i + 1].from_stop` for every consecutive pair
    pub fn is_contiguous(&self) -> bool {
        self.legs
            .windows(2)
            .all(|pair| pair[0].to_stop == pair[1].from_stop)
    }

    pub fn transit_legs(&self) -> impl Iterator<Item = &Leg> {
        self.legs.iter().filter(|leg| leg.kind == LegKind::Transit)
    }

    /// Identifies the path taken, ignoring timing, for de-duplication
    pub fn signature(&self) -> String {
        let mut signature = String::new();
        for leg in &self.legs {
            let route = leg.route_id.as_ref().map(|r| r.as_str()).unwrap_or("walk");
            let _ = write!(signature, "{}:{}>{};", route, leg.from_stop, leg.to_stop);
        }
        signature
    }

    /// Copy of this itinerary with every live overlay removed
    pub fn without_live(&self) -> Self {
        let mut copy = self.clone();
        for leg in &mut copy.legs {
            leg.live = None;
        }
        copy
    }
}

/// Accumulates legs and the running clock for one itinerary
pub(crate) struct ItineraryBuilder {
    departure: NaiveDateTime,
    elapsed: u32,
    legs: Vec<Leg>,
    walking_distance_m: f64,
}

impl ItineraryBuilder {
    pub fn new(departure: NaiveDateTime) -> Self {
        Self {
            departure,
            elapsed: 0,
            legs: Vec::new(),
            walking_distance_m: 0.0,
        }
    }

    fn clock(&self) -> NaiveDateTime {
        self.departure + Duration::minutes(i64::from(self.elapsed))
    }

    pub fn wait(&mut self, minutes: u32) -> &mut Self {
        self.elapsed += minutes;
        self
    }

    pub fn transit(
        &mut self,
        route: &dyn Route,
        from: &dyn TransitStop,
        to: &dyn TransitStop,
        distance_m: f64,
        stop_count: u32,
        minutes: u32,
    ) -> &mut Self {
        let departure = self.clock();
        self.elapsed += minutes;
        self.legs.push(Leg {
            kind: LegKind::Transit,
            mode: Some(route.mode()),
            route_id: Some(route.id().clone()),
            route_name: Some(route.name().into()),
            from_stop: from.id().clone(),
            from_name: from.name().into(),
            to_stop: to.id().clone(),
            to_name: to.name().into(),
            departure,
            arrival: self.clock(),
            duration_minutes: minutes,
            distance_m,
            stop_count,
            live: None,
        });
        self
    }

    pub fn walk(
        &mut self,
        from: &dyn TransitStop,
        to: &dyn TransitStop,
        distance_m: f64,
        minutes: u32,
    ) -> &mut Self {
        let departure = self.clock();
        self.elapsed += minutes;
        self.walking_distance_m += distance_m;
        self.legs.push(Leg {
            kind: LegKind::Walk,
            mode: None,
            route_id: None,
            route_name: None,
            from_stop: from.id().clone(),
            from_name: from.name().into(),
            to_stop: to.id().clone(),
            to_name: to.name().into(),
            departure,
            arrival: self.clock(),
            duration_minutes: minutes,
            distance_m,
            stop_count: 0,
            live: None,
        });
        self
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn finish(self, fare: Fare) -> Itinerary {
        let transit = self
            .legs
            .iter()
            .filter(|leg| leg.kind == LegKind::Transit)
            .count() as u32;

        Itinerary {
            legs: self.legs,
            total_time_minutes: self.elapsed,
            transfer_count: transit.saturating_sub(1),
            walking_distance_m: self.walking_distance_m,
            fare,
        }
    }
}
