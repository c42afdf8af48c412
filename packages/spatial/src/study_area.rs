//! Restricts administrative areas to those inside the reference city.
//!
//! Boundary extracts for a place routinely include neighbouring
//! municipalities that merely touch the city, plus a polygon for the
//! city itself. Only areas lying (almost) entirely inside the city
//! outline are kept.

use geo::MultiPolygon;

use crate::AreaBoundary;
use crate::engine::GeometryEngine;

/// Default fraction of an area allowed to fall outside the city outline.
pub const DEFAULT_OUTSIDE_TOLERANCE: f64 = 1e-3;

/// Keeps areas that lie inside `city` and are not the city itself.
///
/// An area is kept when it intersects the outline and at least
/// `1 - tolerance` of its surface is inside it. Areas named exactly
/// `city_name` are dropped. All geometries must be planar.
pub fn filter_study_areas<E: GeometryEngine + ?Sized>(
    areas: Vec<AreaBoundary>,
    city: &MultiPolygon<f64>,
    city_name: &str,
    tolerance: f64,
    engine: &E,
) -> Vec<AreaBoundary> {
    let total = areas.len();

    let kept: Vec<AreaBoundary> = areas
        .into_iter()
        .filter(|area| {
            if area.name == city_name {
                log::debug!("Dropping city-level polygon '{}'", area.name);
                return false;
            }
            let inside = inside_fraction(&area.geometry, city, engine);
            if inside < 1.0 - tolerance {
                log::debug!(
                    "Dropping '{}': only {:.1}% inside the city",
                    area.name,
                    inside * 100.0
                );
                return false;
            }
            true
        })
        .collect();

    log::info!("Kept {} of {total} areas inside {city_name}", kept.len());
    kept
}

/// Fraction of `geometry` lying inside `outline`, `0.0` if they are
/// disjoint or `geometry` has no area.
pub fn inside_fraction<E: GeometryEngine + ?Sized>(
    geometry: &MultiPolygon<f64>,
    outline: &MultiPolygon<f64>,
    engine: &E,
) -> f64 {
    let total = engine.area(geometry);
    if total <= 0.0 || !engine.intersects(geometry, outline) {
        return 0.0;
    }
    engine.area(&engine.intersection(geometry, outline)) / total
}
