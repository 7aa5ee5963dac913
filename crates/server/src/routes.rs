use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use metro_api_types::{
    ClosestStopResponse, Coordinates, ErrorResponse, HealthResponse, NearbyResponse, PlanRequest,
    PlanResponse, RoutesResponse, SnapshotResponse, StatusResponse, StopTimesResponse,
    StopsResponse, VehiclesResponse,
};
use metro_transit::planner::TripQuery;
use metro_transit::service::{DEFAULT_NEARBY_LIMIT, DEFAULT_NEARBY_RADIUS_M};
use metro_transit::{FareCategory, RouteMode, TransitError, TransitService, VehicleRecord};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::convert;
use crate::error::ApiError;

pub type AppState = Arc<TransitService>;

pub const API_PREFIX: &str = "/adelaide-metro/api";

pub fn create_router(service: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/nearby", get(nearby))
        .route("/stops", get(stops))
        .route("/stop/closest", get(closest_stop))
        .route("/stop/{stop_id}/times", get(stop_times))
        .route("/routes", get(routes))
        .route("/vehicles", get(vehicles))
        .route("/vehicles/snapshot", put(replace_snapshot))
        .route("/status", get(status))
        .route("/plan", post(plan))
        .route("/trip-plan", post(plan));

    Router::new()
        .nest(API_PREFIX, api)
        .fallback(not_found)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(service)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not found")))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct PointParams {
    lat: Option<f64>,
    lon: Option<f64>,
    radius: Option<f64>,
    limit: Option<usize>,
}

impl PointParams {
    fn coordinates(&self) -> Result<(f64, f64), ApiError> {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            return Err(ApiError::BadRequest("lat and lon are required".into()));
        };
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ApiError::BadRequest(format!("invalid coordinates {lat}, {lon}")));
        }
        Ok((lat, lon))
    }
}

async fn nearby(
    State(service): State<AppState>,
    params: Result<Query<PointParams>, QueryRejection>,
) -> Result<Json<NearbyResponse>, ApiError> {
    let Query(params) = params?;
    let (lat, lon) = params.coordinates()?;
    let radius = params.radius.unwrap_or(DEFAULT_NEARBY_RADIUS_M);
    let limit = params.limit.unwrap_or(DEFAULT_NEARBY_LIMIT);

    let stops = service
        .nearby_stops(lat, lon, Some(radius), Some(limit))
        .iter()
        .map(|(stop, distance)| convert::nearby_stop(stop.as_ref(), *distance))
        .collect();

    Ok(Json(NearbyResponse {
        stops,
        center: Coordinates { lat, lon },
        radius,
    }))
}

async fn stops(State(service): State<AppState>) -> Json<StopsResponse> {
    let stops: Vec<_> = service
        .stops()
        .iter()
        .map(|stop| convert::stop(stop.as_ref()))
        .collect();

    Json(StopsResponse {
        count: stops.len(),
        stops,
    })
}

async fn closest_stop(
    State(service): State<AppState>,
    params: Result<Query<PointParams>, QueryRejection>,
) -> Result<Json<ClosestStopResponse>, ApiError> {
    let Query(params) = params?;
    let (lat, lon) = params.coordinates()?;

    let (stop, distance) = service
        .closest_stop(lat, lon)
        .ok_or_else(|| ApiError::NotFound("No stops in catalog".into()))?;

    Ok(Json(ClosestStopResponse {
        stop: convert::stop(stop.as_ref()),
        distance: distance.round() as u64,
    }))
}

async fn stop_times(
    State(service): State<AppState>,
    Path(stop_id): Path<String>,
) -> Result<Json<StopTimesResponse>, ApiError> {
    let upcoming = match service.departures(&stop_id) {
        Ok(upcoming) => upcoming,
        Err(TransitError::StopNotFound(stop)) => {
            return Err(ApiError::NotFound(format!("Stop not found: {stop}")));
        }
        Err(e) => return Err(e.into()),
    };

    let now = convert::adelaide_now();
    Ok(Json(StopTimesResponse {
        stop_id: upcoming.stop.id().to_string(),
        stop_name: upcoming.stop.name().to_string(),
        departures: upcoming
            .departures
            .iter()
            .map(|d| convert::departure(&service, d, now))
            .collect(),
        updated_at: upcoming.captured_at.map(convert::adelaide_timestamp),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    route: Option<String>,
    #[serde(rename = "type")]
    mode: Option<String>,
}

fn parse_mode(mode: Option<&str>) -> Result<Option<RouteMode>, ApiError> {
    match mode.map(str::trim).filter(|m| !m.is_empty()) {
        None => Ok(None),
        Some(m) => RouteMode::parse(m)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown vehicle type {m:?}"))),
    }
}

async fn routes(
    State(service): State<AppState>,
    params: Result<Query<FilterParams>, QueryRejection>,
) -> Result<Json<RoutesResponse>, ApiError> {
    let Query(params) = params?;
    let mode = parse_mode(params.mode.as_deref())?;

    let routes: Vec<_> = service
        .routes_by_mode(mode)
        .iter()
        .map(|route| convert::route(route.as_ref()))
        .collect();

    Ok(Json(RoutesResponse {
        count: routes.len(),
        routes,
    }))
}

async fn vehicles(
    State(service): State<AppState>,
    params: Result<Query<FilterParams>, QueryRejection>,
) -> Result<Json<VehiclesResponse>, ApiError> {
    let Query(params) = params?;
    let mode = parse_mode(params.mode.as_deref())?;

    let listing = service.vehicles(params.route.as_deref(), mode);
    let updated_at = listing.captured_at.map(convert::adelaide_timestamp);

    let vehicles: Vec<_> = listing
        .vehicles
        .iter()
        .map(|v| convert::vehicle(&service, v, updated_at.as_deref()))
        .collect();
    let source = if listing.live {
        "gtfs-rt-live"
    } else {
        "none"
    };

    Ok(Json(VehiclesResponse {
        count: vehicles.len(),
        vehicles,
        source: source.to_string(),
        updated_at,
    }))
}

/// Inbound from the feed collector: one poll's worth of vehicles
async fn replace_snapshot(
    State(service): State<AppState>,
    body: Result<Json<Vec<VehicleRecord>>, JsonRejection>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let Json(records) = body?;
    let update = service.update_vehicle_snapshot(records, Utc::now());

    Ok(Json(SnapshotResponse {
        accepted: update.accepted,
        rejected: update.rejected,
    }))
}

async fn status(State(service): State<AppState>) -> Json<StatusResponse> {
    let status = service.status();
    let (label, source) = if status.connected {
        ("connected", "gtfs-rt")
    } else {
        ("disconnected", "none")
    };

    Json(StatusResponse {
        status: label.to_string(),
        vehicles_cached: status.vehicles_cached,
        last_update: status.last_update.map(convert::adelaide_timestamp),
        source: source.to_string(),
    })
}

fn parse_departure(request: &PlanRequest, now: NaiveDateTime) -> Result<NaiveDateTime, ApiError> {
    let date = match request.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        None => now.date(),
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("invalid date {d:?}, expected YYYY-MM-DD")))?,
    };

    let time = match request
        .departure_time
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        None => now.time(),
        Some(t) => NaiveTime::parse_from_str(t, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
            .map_err(|_| ApiError::BadRequest(format!("invalid time {t:?}, expected HH:MM")))?,
    };

    Ok(date.and_time(time))
}

fn trip_query(request: &PlanRequest, now: NaiveDateTime) -> Result<TripQuery, ApiError> {
    let from = request.from.as_deref().map(str::trim).unwrap_or_default();
    let to = request.to.as_deref().map(str::trim).unwrap_or_default();
    if from.is_empty() || to.is_empty() {
        return Err(ApiError::BadRequest("From and to stops required".into()));
    }

    let category = match request.category.as_deref() {
        None => FareCategory::Regular,
        Some(c) => FareCategory::parse(c)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown fare category {c:?}")))?,
    };

    Ok(TripQuery::new(from, to, parse_departure(request, now)?).with_category(category))
}

async fn plan(
    State(service): State<AppState>,
    body: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<Json<PlanResponse>, ApiError> {
    let Json(request) = body?;
    let query = trip_query(&request, convert::adelaide_now())?;

    let outcome = service.plan_trip(&query)?;
    tracing::info!(
        from = %query.origin,
        to = %query.destination,
        itineraries = outcome.itineraries().len(),
        "trip planned"
    );

    Ok(Json(convert::plan(&outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use metro_transit::StaticTransitProvider;

    const CATALOG: &str = include_str!("../../../data/adelaide-metro.json");

    fn state() -> AppState {
        let provider = StaticTransitProvider::from_json_str(CATALOG).unwrap();
        Arc::new(TransitService::new(Arc::new(provider)))
    }

    fn point(lat: f64, lon: f64) -> Result<Query<PointParams>, QueryRejection> {
        Ok(Query(PointParams {
            lat: Some(lat),
            lon: Some(lon),
            ..Default::default()
        }))
    }

    fn plan_request(from: &str, to: &str, time: &str) -> Result<Json<PlanRequest>, JsonRejection> {
        Ok(Json(PlanRequest {
            from: Some(from.into()),
            to: Some(to.into()),
            departure_time: Some(time.into()),
            // A Wednesday
            date: Some("2025-10-15".into()),
            category: None,
        }))
    }

    #[tokio::test]
    async fn test_plan_pimpala_to_city() {
        let Json(response) = plan(
            State(state()),
            plan_request("Stop 45 Pimpala Rd", "Adelaide Railway Station", "11:45"),
        )
        .await
        .unwrap();

        assert_eq!(response.status, "ok");
        let best = &response.routes[0];
        assert_eq!(best.transfers, 0);
        assert_eq!(best.total_time, 25);
        assert_eq!(best.legs[0].route.as_deref(), Some("Route 174"));
        assert_eq!(best.legs[0].mode.as_deref(), Some("bus"));
        assert_eq!(best.legs[0].departure, "11:45");
        assert_eq!(best.legs[0].arrival, "12:10");
        assert!((best.fare - 2.60).abs() < 1e-9);
        assert_eq!(best.fare_period, "offPeak");
    }

    #[tokio::test]
    async fn test_plan_concession_fare() {
        let mut request = plan_request("Stop 45 Pimpala Rd", "Adelaide Railway Station", "11:45")
            .unwrap()
            .0;
        request.category = Some("concession".into());

        let Json(response) = plan(State(state()), Ok(Json(request))).await.unwrap();
        assert!((response.routes[0].fare - 1.30).abs() < 1e-9);
        assert_eq!(response.routes[0].fare_category, "concession");
    }

    #[tokio::test]
    async fn test_plan_same_stop() {
        let Json(response) = plan(
            State(state()),
            plan_request("Victoria Square", "Victoria Square", "08:00"),
        )
        .await
        .unwrap();

        assert_eq!(response.status, "already_there");
        assert_eq!(response.routes.len(), 1);
        assert_eq!(response.routes[0].total_time, 0);
        assert!(response.routes[0].legs.is_empty());
    }

    #[tokio::test]
    async fn test_plan_no_route_is_ok_and_empty() {
        let Json(response) = plan(
            State(state()),
            plan_request("Mount Barker Interchange", "Adelaide Railway Station", "08:00"),
        )
        .await
        .unwrap();

        assert_eq!(response.status, "no_route_found");
        assert!(response.routes.is_empty());
    }

    #[tokio::test]
    async fn test_plan_unknown_stop_is_bad_request() {
        let Err(err) = plan(State(state()), plan_request("Nowhere", "Victoria Square", "08:00")).await
        else {
            panic!("expected an error");
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_plan_missing_stops_is_bad_request() {
        let Err(err) = plan(State(state()), Ok(Json(PlanRequest::default()))).await else {
            panic!("expected an error");
        };
        assert_eq!(err.to_string(), "From and to stops required");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let Err(err) = plan(State(state()), plan_request("Victoria Square", "Glenelg", "25:99")).await
        else {
            panic!("expected an error");
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_departure_defaults_to_now() {
        let now = NaiveDate::from_ymd_opt(2025, 10, 18)
            .unwrap()
            .and_hms_opt(7, 30, 0)
            .unwrap();

        let request = PlanRequest {
            departure_time: Some("14:05".into()),
            ..Default::default()
        };
        assert_eq!(
            parse_departure(&request, now).unwrap(),
            now.date().and_hms_opt(14, 5, 0).unwrap()
        );
        assert_eq!(parse_departure(&PlanRequest::default(), now).unwrap(), now);
    }

    #[tokio::test]
    async fn test_nearby() {
        let Json(response) = nearby(State(state()), point(-34.9212, 138.5960)).await.unwrap();

        assert_eq!(response.radius, 500.0);
        assert_eq!(response.stops[0].i, "c_adelaide_station");
        assert_eq!(response.stops[0].n, "Adelaide Railway Station");
        assert!(response.stops.len() <= 5);
        assert!(response.stops.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_nearby_zero_radius_and_missing_coordinates() {
        let params = Ok(Query(PointParams {
            lat: Some(-34.9212),
            lon: Some(138.5960),
            radius: Some(0.0),
            limit: None,
        }));
        let Json(response) = nearby(State(state()), params).await.unwrap();
        assert!(response.stops.is_empty());

        let missing = Ok(Query(PointParams::default()));
        let Err(err) = nearby(State(state()), missing).await else {
            panic!("expected an error");
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_closest_stop() {
        let Json(response) = closest_stop(State(state()), point(-34.9800, 138.5140)).await.unwrap();
        assert_eq!(response.stop.id, "t_moseley_sq");
        assert!(response.distance < 500);
    }

    #[tokio::test]
    async fn test_routes_filter() {
        let Json(all) = routes(State(state()), Ok(Query(FilterParams::default())))
            .await
            .unwrap();
        assert_eq!(all.count, all.routes.len());

        let trains = Ok(Query(FilterParams {
            route: None,
            mode: Some("train".into()),
        }));
        let Json(trains) = routes(State(state()), trains).await.unwrap();
        assert!(trains.count > 0);
        assert!(trains.routes.iter().all(|r| r.mode == "train"));

        let ferries = Ok(Query(FilterParams {
            route: None,
            mode: Some("ferry".into()),
        }));
        assert!(routes(State(state()), ferries).await.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_then_vehicles_and_status() {
        let state = state();

        let Json(before) = status(State(state.clone())).await;
        assert_eq!(before.status, "disconnected");

        let records: Vec<VehicleRecord> = serde_json::from_str(
            r#"[
                {"id": "bus-174-1", "route_id": "174", "lat": -35.05, "lon": 138.55,
                 "bearing": 10, "speed": 41.26, "next_stop_id": "s_marion", "arrival_minutes": 3},
                {"id": "train-1", "route_id": "SEAFRD", "lat": -34.95, "lon": 138.58},
                {"id": "far-away", "route_id": "174", "lat": -33.87, "lon": 151.21},
                {"route_id": "174", "lat": -35.0, "lon": 138.5}
            ]"#,
        )
        .unwrap();
        let Json(update) = replace_snapshot(State(state.clone()), Ok(Json(records)))
            .await
            .unwrap();
        assert_eq!(update, SnapshotResponse { accepted: 2, rejected: 2 });

        let Json(after) = status(State(state.clone())).await;
        assert_eq!(after.status, "connected");
        assert_eq!(after.vehicles_cached, 2);
        assert!(after.last_update.is_some());

        let buses = Ok(Query(FilterParams {
            route: None,
            mode: Some("bus".into()),
        }));
        let Json(listing) = vehicles(State(state.clone()), buses).await.unwrap();
        assert_eq!(listing.count, 1);
        assert_eq!(listing.source, "gtfs-rt-live");
        let bus = &listing.vehicles[0];
        assert_eq!(bus.route_name, "Route 174");
        assert_eq!(bus.next_stop, "Westfield Marion");
        assert_eq!(bus.speed, 41.3);
        assert_eq!(bus.arrival_minutes, Some(3));

        let Json(trains) = vehicles(
            State(state.clone()),
            Ok(Query(FilterParams {
                route: Some("SEAFRD".into()),
                mode: None,
            })),
        )
        .await
        .unwrap();
        assert_eq!(trains.vehicles[0].mode, "train");

        // The plan picks up the live bus approaching Marion
        let Json(response) = plan(
            State(state.clone()),
            plan_request("Westfield Marion", "Adelaide Railway Station", "11:45"),
        )
        .await
        .unwrap();
        let live = response.routes[0].legs[0].live.as_ref().unwrap();
        assert_eq!(live.vehicle_id, "bus-174-1");
        assert_eq!(live.eta_minutes, Some(3));

        // A push where every record is dropped leaves both endpoints agreeing
        let rejected: Vec<VehicleRecord> =
            serde_json::from_str(r#"[{"route_id": "174", "lat": -35.0, "lon": 138.5}]"#).unwrap();
        let Json(update) = replace_snapshot(State(state.clone()), Ok(Json(rejected)))
            .await
            .unwrap();
        assert_eq!(update, SnapshotResponse { accepted: 0, rejected: 1 });

        let Json(empty) = status(State(state.clone())).await;
        assert_eq!(empty.status, "disconnected");
        assert_eq!(empty.source, "none");
        assert!(empty.last_update.is_some());

        let Json(listing) = vehicles(State(state), Ok(Query(FilterParams::default())))
            .await
            .unwrap();
        assert_eq!(listing.count, 0);
        assert_eq!(listing.source, "none");
        assert!(listing.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_stop_times() {
        let state = state();

        let Json(quiet) = stop_times(State(state.clone()), Path("s_marion".into()))
            .await
            .unwrap();
        assert_eq!(quiet.stop_name, "Westfield Marion");
        assert!(quiet.departures.is_empty());
        assert!(quiet.updated_at.is_none());

        let records: Vec<VehicleRecord> = serde_json::from_str(
            r#"[
                {"id": "bus-174-2", "route_id": "174", "lat": -35.09, "lon": 138.55,
                 "next_stop_id": "s_pimpala_45", "arrival_minutes": 7, "occupancy": "FULL"},
                {"id": "bus-174-1", "route_id": "174", "lat": -35.05, "lon": 138.55,
                 "next_stop_id": "s_marion", "arrival_minutes": 3}
            ]"#,
        )
        .unwrap();
        replace_snapshot(State(state.clone()), Ok(Json(records)))
            .await
            .unwrap();

        let Json(times) = stop_times(State(state.clone()), Path("Westfield Marion".into()))
            .await
            .unwrap();
        assert_eq!(times.stop_id, "s_marion");
        assert!(times.updated_at.is_some());
        let vehicles: Vec<&str> = times.departures.iter().map(|d| d.vehicle_id.as_str()).collect();
        assert_eq!(vehicles, vec!["bus-174-1", "bus-174-2"]);
        assert_eq!(times.departures[0].route_name, "Route 174");
        assert_eq!(times.departures[0].mode, "bus");
        assert_eq!(times.departures[0].arrival_minutes, Some(3));
        assert_eq!(times.departures[0].estimated_time.as_ref().map(String::len), Some(5));
        assert_eq!(times.departures[1].occupancy.as_deref(), Some("full"));

        let missing = stop_times(State(state), Path("Nowhere".into())).await.unwrap_err();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let response = not_found().await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
