#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Polygon handling for the urban heat pipeline.
//!
//! Loads administrative boundaries and vegetation features from `GeoJSON`,
//! projects them into a UTM zone, and computes per-area green coverage.
//! All area arithmetic happens in projected metres; geographic
//! coordinates are only used for storage and rendering.

pub mod coverage;
pub mod engine;
pub mod progress;
pub mod projection;
pub mod study_area;

use geo::MultiPolygon;
use geojson::{Feature, GeoJson};
use urban_heat_area_models::VegetationCategory;

pub use coverage::{OverlapPolicy, compute_coverage};
pub use engine::{GeometryEngine, PlanarEngine};
pub use projection::UtmZone;

/// Errors from geometry loading and projection.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// The input was not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// A coordinate could not be projected.
    #[error("Projection error: {message}")]
    Projection {
        /// Description of what went wrong.
        message: String,
    },

    /// The input parsed but did not contain usable polygons.
    #[error("Invalid geometry: {message}")]
    InvalidGeometry {
        /// Description of what went wrong.
        message: String,
    },
}

/// A named administrative area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaBoundary {
    /// Canonical area name.
    pub name: String,
    /// Boundary, geographic or planar depending on pipeline stage.
    pub geometry: MultiPolygon<f64>,
}

/// A qualifying green-space polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct VegetationFeature {
    /// Polygon, geographic or planar depending on pipeline stage.
    pub geometry: MultiPolygon<f64>,
}

impl AreaBoundary {
    /// Returns a copy of this area with its geometry reprojected.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the geometry cannot be reprojected.
    pub fn to_planar<E: GeometryEngine + ?Sized>(&self, engine: &E) -> Result<Self, SpatialError> {
        Ok(Self {
            name: self.name.clone(),
            geometry: engine.to_planar(&self.geometry)?,
        })
    }

    /// Returns a copy of this area with its geometry back in WGS84.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the geometry cannot be unprojected.
    pub fn to_geographic<E: GeometryEngine + ?Sized>(
        &self,
        engine: &E,
    ) -> Result<Self, SpatialError> {
        Ok(Self {
            name: self.name.clone(),
            geometry: engine.to_geographic(&self.geometry)?,
        })
    }
}

impl VegetationFeature {
    /// Returns a copy of this feature with its geometry reprojected.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the geometry cannot be reprojected.
    pub fn to_planar<E: GeometryEngine + ?Sized>(&self, engine: &E) -> Result<Self, SpatialError> {
        Ok(Self {
            geometry: engine.to_planar(&self.geometry)?,
        })
    }
}

/// Reads named area boundaries from a `GeoJSON` `FeatureCollection`.
///
/// The area name is taken from the `name_property` property. Features
/// without a name or without polygonal geometry are skipped.
///
/// # Errors
///
/// Returns [`SpatialError`] if the document is not valid `GeoJSON`.
pub fn load_boundaries(
    geojson_str: &str,
    name_property: &str,
) -> Result<Vec<AreaBoundary>, SpatialError> {
    let features = parse_features(geojson_str)?;
    let total = features.len();

    let boundaries: Vec<AreaBoundary> = features
        .into_iter()
        .filter_map(|feature| {
            let name = feature
                .property(name_property)
                .and_then(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())?
                .to_string();

            let Some(geometry) = feature_to_multipolygon(feature) else {
                log::warn!("Skipping area '{name}': no polygonal geometry");
                return None;
            };

            Some(AreaBoundary { name, geometry })
        })
        .collect();

    log::info!("Loaded {} of {total} boundary features", boundaries.len());
    Ok(boundaries)
}

/// Reads qualifying vegetation polygons from a `GeoJSON` document.
///
/// A feature qualifies when one of its tags names a
/// [`VegetationCategory`] (`leisure=park`, `landuse=forest`, ...).
///
/// # Errors
///
/// Returns [`SpatialError`] if the document is not valid `GeoJSON`.
pub fn load_vegetation(geojson_str: &str) -> Result<Vec<VegetationFeature>, SpatialError> {
    let features = parse_features(geojson_str)?;
    let total = features.len();

    let vegetation: Vec<VegetationFeature> = features
        .into_iter()
        .filter(|feature| vegetation_category(feature).is_some())
        .filter_map(feature_to_multipolygon)
        .map(|geometry| VegetationFeature { geometry })
        .collect();

    log::info!("Loaded {} vegetation polygons from {total} features", vegetation.len());
    Ok(vegetation)
}

/// Reads a city outline, merging every polygon in the document.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidGeometry`] if the document contains no
/// polygons.
pub fn load_outline(geojson_str: &str) -> Result<MultiPolygon<f64>, SpatialError> {
    let polygons: Vec<geo::Polygon<f64>> = parse_features(geojson_str)?
        .into_iter()
        .filter_map(feature_to_multipolygon)
        .flat_map(|mp| mp.0)
        .collect();

    if polygons.is_empty() {
        return Err(SpatialError::InvalidGeometry {
            message: "city outline contains no polygons".to_string(),
        });
    }

    Ok(MultiPolygon(polygons))
}

/// Converts a geometry into a `GeoJSON` geometry for rendering.
#[must_use]
pub fn to_geojson_geometry(geometry: &MultiPolygon<f64>) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::from(geometry))
}

/// The vegetation category of a feature, if any of its tags qualifies.
fn vegetation_category(feature: &Feature) -> Option<VegetationCategory> {
    ["leisure", "landuse"].into_iter().find_map(|key| {
        feature
            .property(key)
            .and_then(serde_json::Value::as_str)
            .and_then(|value| VegetationCategory::from_tag(key, value))
    })
}

/// Flattens any `GeoJSON` document into its features. A bare geometry
/// becomes a single property-less feature.
fn parse_features(geojson_str: &str) -> Result<Vec<Feature>, SpatialError> {
    let geojson: GeoJson = geojson_str.parse()?;
    Ok(match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    })
}

/// Converts a feature's geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn feature_to_multipolygon(feature: Feature) -> Option<MultiPolygon<f64>> {
    let geometry = feature.geometry?;
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use geo::{MultiPolygon, polygon};

    /// Axis-aligned rectangle from its corners.
    pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: min_x, y: min_y),
            (x: max_x, y: min_y),
            (x: max_x, y: max_y),
            (x: min_x, y: max_y),
            (x: min_x, y: min_y),
        ]])
    }

    /// Axis-aligned square from its lower-left corner.
    pub fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        rect(x, y, x + size, y + size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "name": "Mitte" },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]] }
            },
            {
                "type": "Feature",
                "properties": { "name": "Spandau" },
                "geometry": { "type": "MultiPolygon", "coordinates": [[[[2,0],[3,0],[3,1],[2,1],[2,0]]]] }
            },
            {
                "type": "Feature",
                "properties": { "name": "  " },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]] }
            },
            {
                "type": "Feature",
                "properties": { "name": "Fernsehturm" },
                "geometry": { "type": "Point", "coordinates": [0.5, 0.5] }
            }
        ]
    }"#;

    const VEGETATION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "leisure": "park" },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]] }
            },
            {
                "type": "Feature",
                "properties": { "landuse": "forest" },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]] }
            },
            {
                "type": "Feature",
                "properties": { "landuse": "residential" },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]] }
            },
            {
                "type": "Feature",
                "properties": { "leisure": "garden" },
                "geometry": { "type": "Point", "coordinates": [0.5, 0.5] }
            }
        ]
    }"#;

    #[test]
    fn loads_named_polygonal_boundaries() {
        let boundaries = load_boundaries(BOUNDARIES, "name").unwrap();
        let names: Vec<&str> = boundaries.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Mitte", "Spandau"]);
        assert_eq!(boundaries[1].geometry.0.len(), 1);
    }

    #[test]
    fn custom_name_property() {
        let boundaries = load_boundaries(BOUNDARIES, "bezirk").unwrap();
        assert!(boundaries.is_empty());
    }

    #[test]
    fn loads_only_tagged_vegetation_polygons() {
        let vegetation = load_vegetation(VEGETATION).unwrap();
        assert_eq!(vegetation.len(), 2);
    }

    #[test]
    fn outline_merges_polygons() {
        let outline = load_outline(BOUNDARIES).unwrap();
        assert_eq!(outline.0.len(), 3);
    }

    #[test]
    fn outline_accepts_bare_geometry() {
        let outline =
            load_outline(r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}"#)
                .unwrap();
        assert_eq!(outline.0.len(), 1);
    }

    #[test]
    fn outline_without_polygons_is_rejected() {
        let result = load_outline(r#"{"type":"Point","coordinates":[0,0]}"#);
        assert!(matches!(result, Err(SpatialError::InvalidGeometry { .. })));
    }

    #[test]
    fn invalid_geojson_is_an_error() {
        assert!(matches!(
            load_boundaries("{ not json", "name"),
            Err(SpatialError::GeoJson(_))
        ));
    }

    #[test]
    fn geometry_survives_geojson_roundtrip() {
        let original = test_support::square(0.0, 0.0, 2.0);
        let geometry = to_geojson_geometry(&original);
        let back: geo::Geometry<f64> = geometry.try_into().unwrap();
        assert_eq!(back, geo::Geometry::MultiPolygon(original));
    }
}
