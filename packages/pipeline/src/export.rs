//! `GeoJSON` layers for the map renderer.
//!
//! Each layer is a `FeatureCollection` with one feature per area,
//! geometry back in WGS84 and the area's values as properties. Values
//! are rounded for display.

use std::collections::HashMap;

use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use urban_heat_area_models::{AreaTemperature, GreenCoverage, PriorityRecord};
use urban_heat_spatial::{AreaBoundary, GeometryEngine, SpatialError, to_geojson_geometry};

/// Rounds `value` to `places` decimal places.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Priority layer: `area`, `mean_temp_c`, `green_coverage`,
/// `green_coverage_pct`, `priority_score`.
///
/// Areas without a priority record are left out.
///
/// # Errors
///
/// Returns [`SpatialError`] if a geometry cannot be unprojected.
pub fn priority_layer<E: GeometryEngine + ?Sized>(
    areas: &[AreaBoundary],
    records: &[PriorityRecord],
    engine: &E,
) -> Result<FeatureCollection, SpatialError> {
    let by_area = first_by_area(records, |r| &r.area);

    layer(areas, engine, |name| {
        let record = by_area.get(name)?;
        let mut properties = JsonObject::new();
        properties.insert("area".to_string(), JsonValue::from(record.area.clone()));
        properties.insert("mean_temp_c".to_string(), temperature_value(record.mean_temp_c));
        insert_coverage(&mut properties, record.green_area);
        properties.insert(
            "priority_score".to_string(),
            JsonValue::from(round_to(record.priority_score, 2)),
        );
        Some(properties)
    })
}

/// Temperature layer: `area`, `mean_temp_c`.
///
/// Every area is included; areas without a temperature get `null`.
///
/// # Errors
///
/// Returns [`SpatialError`] if a geometry cannot be unprojected.
pub fn temperature_layer<E: GeometryEngine + ?Sized>(
    areas: &[AreaBoundary],
    temperatures: &[AreaTemperature],
    engine: &E,
) -> Result<FeatureCollection, SpatialError> {
    let by_area = first_by_area(temperatures, |t| &t.area);

    layer(areas, engine, |name| {
        let mut properties = JsonObject::new();
        properties.insert("area".to_string(), JsonValue::from(name));
        properties.insert(
            "mean_temp_c".to_string(),
            temperature_value(by_area.get(name).and_then(|t| t.mean_temp_c)),
        );
        Some(properties)
    })
}

/// Coverage layer: `area`, `green_coverage`, `green_coverage_pct`.
///
/// Areas without a coverage row are left out.
///
/// # Errors
///
/// Returns [`SpatialError`] if a geometry cannot be unprojected.
pub fn coverage_layer<E: GeometryEngine + ?Sized>(
    areas: &[AreaBoundary],
    coverage: &[GreenCoverage],
    engine: &E,
) -> Result<FeatureCollection, SpatialError> {
    let by_area = first_by_area(coverage, |c| &c.area);

    layer(areas, engine, |name| {
        let row = by_area.get(name)?;
        let mut properties = JsonObject::new();
        properties.insert("area".to_string(), JsonValue::from(name));
        insert_coverage(&mut properties, row.green_area);
        Some(properties)
    })
}

fn layer<E: GeometryEngine + ?Sized>(
    areas: &[AreaBoundary],
    engine: &E,
    properties_for: impl Fn(&str) -> Option<JsonObject>,
) -> Result<FeatureCollection, SpatialError> {
    let mut features = Vec::with_capacity(areas.len());

    for area in areas {
        let Some(properties) = properties_for(&area.name) else {
            log::debug!("No values for '{}', leaving it off the layer", area.name);
            continue;
        };
        let geometry = engine.to_geographic(&area.geometry)?;
        features.push(Feature {
            bbox: None,
            geometry: Some(to_geojson_geometry(&geometry)),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn insert_coverage(properties: &mut JsonObject, green_area: f64) {
    properties.insert(
        "green_coverage".to_string(),
        JsonValue::from(round_to(green_area, 3)),
    );
    properties.insert(
        "green_coverage_pct".to_string(),
        JsonValue::from(round_to(green_area * 100.0, 2)),
    );
}

fn temperature_value(mean_temp_c: Option<f64>) -> JsonValue {
    mean_temp_c.map_or(JsonValue::Null, |t| JsonValue::from(round_to(t, 2)))
}

fn first_by_area<'a, T>(rows: &'a [T], key: impl Fn(&'a T) -> &'a String) -> HashMap<&'a str, &'a T> {
    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
        map.entry(key(row).as_str()).or_insert(row);
    }
    map
}
