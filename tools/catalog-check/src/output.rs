use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use metro_transit::{Route, TransitProvider, TransitStop};
use std::path::Path;

fn properties(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn stop_to_feature(stop: &dyn TransitStop) -> Feature {
    let location = stop.location();
    let mut props = vec![
        ("feature_type", serde_json::json!("stop")),
        ("id", serde_json::json!(stop.id().as_str())),
        ("name", serde_json::json!(stop.name())),
    ];
    if let Some(mode) = stop.mode() {
        props.push(("type", serde_json::json!(mode.as_str())));
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![location.x(), location.y()]))),
        id: None,
        properties: Some(properties(&props)),
        foreign_members: None,
    }
}

/// The drawn path when the catalog has one, else straight lines between stops
fn route_to_feature(provider: &dyn TransitProvider, route: &dyn Route) -> Feature {
    let line: Vec<Vec<f64>> = match route.waypoints() {
        Some(waypoints) => waypoints.coords().map(|c| vec![c.x, c.y]).collect(),
        None => route
            .stop_sequence()
            .iter()
            .filter_map(|id| provider.get_stop(id))
            .map(|stop| vec![stop.location().x(), stop.location().y()])
            .collect(),
    };

    let props = [
        ("feature_type", serde_json::json!("route")),
        ("id", serde_json::json!(route.id().as_str())),
        ("name", serde_json::json!(route.name())),
        ("type", serde_json::json!(route.mode().as_str())),
        ("color", serde_json::json!(route.color())),
        ("stop_count", serde_json::json!(route.stop_sequence().len())),
    ];

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(line))),
        id: None,
        properties: Some(properties(&props)),
        foreign_members: None,
    }
}

/// Write every stop and route to a GeoJSON file for inspection on a map
pub fn write_catalog_geojson(provider: &dyn TransitProvider, output_path: &Path) -> Result<()> {
    let stops = provider.all_stops();
    let routes = provider.all_routes();
    log::info!(
        "Writing {} stops and {} routes to {}",
        stops.len(),
        routes.len(),
        output_path.display()
    );

    let features: Vec<Feature> = stops
        .iter()
        .map(|stop| stop_to_feature(stop.as_ref()))
        .chain(routes.iter().map(|route| route_to_feature(provider, route.as_ref())))
        .collect();

    let feature_collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let geojson = GeoJson::from(feature_collection);
    let json_string = serde_json::to_string_pretty(&geojson).context("Failed to serialize GeoJSON")?;

    std::fs::write(output_path, json_string)
        .with_context(|| format!("Failed to write GeoJSON to {}", output_path.display()))?;

    Ok(())
}
