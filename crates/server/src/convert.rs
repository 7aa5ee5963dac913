//! Domain values to API response shapes.

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use chrono_tz::Australia::Adelaide;
use metro_api_types as api;
use metro_transit::planner::{Itinerary, Leg, LegKind, PlanOutcome};
use metro_transit::{Departure, Route, TransitService, TransitStop, VehiclePosition};

/// `HH:MM`
pub fn clock(time: NaiveDateTime) -> String {
    time.format("%H:%M").to_string()
}

/// ISO 8601 in Adelaide local time, with its UTC offset
pub fn adelaide_timestamp(time: DateTime<Utc>) -> String {
    time.with_timezone(&Adelaide)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Current wall-clock time in Adelaide
pub fn adelaide_now() -> NaiveDateTime {
    Utc::now().with_timezone(&Adelaide).naive_local()
}

fn whole_meters(meters: f64) -> u64 {
    meters.max(0.0).round() as u64
}

pub fn stop(stop: &dyn TransitStop) -> api::Stop {
    let location = stop.location();
    api::Stop {
        id: stop.id().to_string(),
        name: stop.name().to_string(),
        lat: location.y(),
        lon: location.x(),
        mode: stop.mode().map(|m| m.as_str().to_string()),
    }
}

pub fn nearby_stop(stop: &dyn TransitStop, distance: f64) -> api::NearbyStop {
    let location = stop.location();
    api::NearbyStop {
        n: stop.name().to_string(),
        i: stop.id().to_string(),
        lat: location.y(),
        lon: location.x(),
        distance: whole_meters(distance),
    }
}

pub fn route(route: &dyn Route) -> api::Route {
    api::Route {
        id: route.id().to_string(),
        name: route.name().to_string(),
        mode: route.mode().as_str().to_string(),
        color: route.color().map(str::to_string),
        stops: route
            .stop_sequence()
            .iter()
            .map(|id| id.to_string())
            .collect(),
        waypoints: route
            .waypoints()
            .map(|line| line.coords().map(|c| [c.y, c.x]).collect())
            .unwrap_or_default(),
        bidirectional: route.bidirectional(),
        destinations: route.destinations().iter().map(|d| d.to_string()).collect(),
    }
}

pub fn vehicle(
    service: &TransitService,
    vehicle: &VehiclePosition,
    updated_at: Option<&str>,
) -> api::Vehicle {
    api::Vehicle {
        id: vehicle.vehicle_id.to_string(),
        route_id: vehicle.route_id.to_string(),
        route_name: service.route_name(&vehicle.route_id),
        mode: service.route_mode(&vehicle.route_id).as_str().to_string(),
        lat: vehicle.lat(),
        lon: vehicle.lon(),
        bearing: vehicle.heading.unwrap_or(0.0),
        speed: (vehicle.speed_kmh * 10.0).round() / 10.0,
        timestamp: vehicle.timestamp,
        trip_id: vehicle.trip_id.as_deref().map(str::to_string),
        updated_at: updated_at.map(str::to_string),
        destination: service.route_destination(&vehicle.route_id),
        next_stop: vehicle
            .next_stop
            .as_ref()
            .map(|id| service.stop_display_name(id.as_str()))
            .unwrap_or_else(|| "Unknown".to_string()),
        arrival_minutes: vehicle.eta_minutes,
        occupancy: vehicle.occupancy.map(|o| o.as_str().to_string()),
        status: "on-time".to_string(),
    }
}

/// `now` is Adelaide wall time; ETAs count from it
pub fn departure(service: &TransitService, departure: &Departure, now: NaiveDateTime) -> api::StopDeparture {
    let vehicle = &departure.vehicle;
    api::StopDeparture {
        route_id: vehicle.route_id.to_string(),
        route_name: service.route_name(&vehicle.route_id),
        mode: service.route_mode(&vehicle.route_id).as_str().to_string(),
        destination: departure.headsign.to_string(),
        vehicle_id: vehicle.vehicle_id.to_string(),
        estimated_time: vehicle
            .eta_minutes
            .map(|eta| clock(now + Duration::minutes(i64::from(eta)))),
        arrival_minutes: vehicle.eta_minutes,
        occupancy: vehicle.occupancy.map(|o| o.as_str().to_string()),
        status: "on-time".to_string(),
    }
}

pub fn leg(leg: &Leg) -> api::Leg {
    api::Leg {
        kind: leg.kind.as_str().to_string(),
        mode: leg.mode.map(|m| m.as_str().to_string()),
        route: leg.route_name.as_deref().map(str::to_string),
        route_id: leg.route_id.as_ref().map(|r| r.to_string()),
        from: leg.from_name.to_string(),
        to: leg.to_name.to_string(),
        from_id: leg.from_stop.to_string(),
        to_id: leg.to_stop.to_string(),
        departure: clock(leg.departure),
        arrival: clock(leg.arrival),
        duration: leg.duration_minutes,
        distance: whole_meters(leg.distance_m),
        stops: (leg.kind == LegKind::Transit).then_some(leg.stop_count),
        live: leg.live.as_ref().map(|live| api::LiveVehicle {
            vehicle_id: live.vehicle_id.to_string(),
            eta_minutes: live.eta_minutes,
            occupancy: live.occupancy.map(|o| o.as_str().to_string()),
            speed_kmh: live.speed_kmh,
        }),
    }
}

pub fn itinerary(itinerary: &Itinerary) -> api::Itinerary {
    let kind = if itinerary.transit_legs().next().is_some() {
        LegKind::Transit
    } else {
        LegKind::Walk
    };

    api::Itinerary {
        kind: kind.as_str().to_string(),
        total_time: itinerary.total_time_minutes,
        transfers: itinerary.transfer_count,
        walking_distance: whole_meters(itinerary.walking_distance_m),
        fare: itinerary.fare.dollars(),
        fare_category: itinerary.fare.category.as_str().to_string(),
        fare_period: itinerary.fare.period.as_str().to_string(),
        legs: itinerary.legs.iter().map(leg).collect(),
    }
}

pub fn plan(outcome: &PlanOutcome) -> api::PlanResponse {
    let status = match outcome {
        PlanOutcome::Itineraries(_) => "ok",
        PlanOutcome::AlreadyThere(_) => "already_there",
        PlanOutcome::NoRouteFound => "no_route_found",
    };

    api::PlanResponse {
        status: status.to_string(),
        routes: outcome.itineraries().iter().map(itinerary).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_adelaide_timestamp_carries_offset() {
        // Daylight saving (ACDT, +10:30) is in effect in January
        let summer = Utc.with_ymd_and_hms(2025, 1, 15, 1, 15, 0).unwrap();
        assert_eq!(adelaide_timestamp(summer), "2025-01-15T11:45:00+10:30");

        // ACST, +09:30, in July
        let winter = Utc.with_ymd_and_hms(2025, 7, 15, 2, 15, 0).unwrap();
        assert_eq!(adelaide_timestamp(winter), "2025-07-15T11:45:00+09:30");
    }

    #[test]
    fn test_clock() {
        let time = NaiveDate::from_ymd_opt(2025, 10, 15)
            .unwrap()
            .and_hms_opt(9, 5, 59)
            .unwrap();
        assert_eq!(clock(time), "09:05");
    }

    #[test]
    fn test_whole_meters() {
        assert_eq!(whole_meters(227.5), 228);
        assert_eq!(whole_meters(-3.0), 0);
    }
}
