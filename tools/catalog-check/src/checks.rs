use std::collections::HashMap;

use metro_transit::spatial::{haversine_distance, path_length};
use metro_transit::{Route, ServiceArea, TransitProvider};

/// Consecutive stops further apart than this are probably a data error
pub const MAX_HOP_METERS: f64 = 15_000.0;

#[derive(Debug, Default)]
pub struct CheckReport {
    pub stop_count: usize,
    pub route_count: usize,
    pub warnings: Vec<String>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Length in meters of a route ridden stop to stop
pub fn route_length_m(provider: &dyn TransitProvider, route: &dyn Route) -> f64 {
    let points: Vec<_> = route
        .stop_sequence()
        .iter()
        .filter_map(|id| provider.get_stop(id))
        .map(|stop| stop.location())
        .collect();
    path_length(&points)
}

/// Problems that load fine but make for poor plans
pub fn check_catalog(provider: &dyn TransitProvider) -> CheckReport {
    let stops = provider.all_stops();
    let routes = provider.all_routes();
    let mut warnings = Vec::new();

    for stop in &stops {
        if provider.routes_serving(stop.id()).is_empty() {
            warnings.push(format!("stop {} ({}) is not served by any route", stop.id(), stop.name()));
        }
    }

    let area = provider.service_area().unwrap_or(ServiceArea::ADELAIDE);
    for stop in &stops {
        let location = stop.location();
        if !area.contains(location.y(), location.x()) {
            warnings.push(format!("stop {} ({}) is outside the service area", stop.id(), stop.name()));
        }
    }

    let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
    for stop in &stops {
        by_name
            .entry(stop.name().to_lowercase())
            .or_default()
            .push(stop.id().to_string());
    }
    let mut shared: Vec<_> = by_name.into_iter().filter(|(_, ids)| ids.len() > 1).collect();
    shared.sort();
    for (name, ids) in shared {
        warnings.push(format!(
            "stops {} share the name {name:?}; lookups by name resolve to {}",
            ids.join(", "),
            ids[0]
        ));
    }

    for route in &routes {
        let sequence = route.stop_sequence();
        if sequence.len() < 2 {
            warnings.push(format!("route {} has a single stop and can never be ridden", route.id()));
        }

        for pair in sequence.windows(2) {
            let (Some(a), Some(b)) = (provider.get_stop(&pair[0]), provider.get_stop(&pair[1])) else {
                continue;
            };
            let hop = haversine_distance(a.location(), b.location());
            if hop > MAX_HOP_METERS {
                warnings.push(format!(
                    "route {} hops {:.1} km from {} to {}",
                    route.id(),
                    hop / 1000.0,
                    a.name(),
                    b.name()
                ));
            }
        }
    }

    CheckReport {
        stop_count: stops.len(),
        route_count: routes.len(),
        warnings,
    }
}
