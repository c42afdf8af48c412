//! Green coverage aggregation.
//!
//! For every area boundary, clips the vegetation polygons to the boundary
//! and divides the clipped area by the boundary area. Both inputs must
//! already be in the same planar frame.

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use urban_heat_area_models::GreenCoverage;

use crate::engine::GeometryEngine;
use crate::progress::ProgressCallback;
use crate::{AreaBoundary, VegetationFeature};

/// How overlapping vegetation polygons are accounted for.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OverlapPolicy {
    /// Sum every clipped piece. Overlapping features are counted twice,
    /// so coverage can exceed 1.0. Matches the published reference
    /// tables.
    #[default]
    SumIntersections,
    /// Union the clipped pieces before measuring. Coverage stays in
    /// `[0, 1]`.
    UnionBeforeSum,
}

/// Computes the green coverage fraction of every area.
///
/// Output order follows `areas`. An area no vegetation touches gets
/// exactly `0.0`, as does a degenerate boundary with zero area.
pub fn compute_coverage<E: GeometryEngine + ?Sized>(
    areas: &[AreaBoundary],
    vegetation: &[VegetationFeature],
    policy: OverlapPolicy,
    engine: &E,
    progress: &dyn ProgressCallback,
) -> Vec<GreenCoverage> {
    log::info!(
        "Computing green coverage for {} areas against {} vegetation features ({policy})",
        areas.len(),
        vegetation.len()
    );
    progress.set_total(areas.len() as u64);

    let coverage = areas
        .iter()
        .map(|area| {
            progress.set_message(area.name.clone());
            let green_area = coverage_fraction(&area.geometry, vegetation, policy, engine);
            log::debug!("{}: green coverage {green_area:.4}", area.name);
            progress.inc(1);
            GreenCoverage {
                area: area.name.clone(),
                green_area,
            }
        })
        .collect();

    progress.finish("Green coverage computed".to_string());
    coverage
}

/// Coverage fraction of a single boundary.
pub fn coverage_fraction<E: GeometryEngine + ?Sized>(
    boundary: &MultiPolygon<f64>,
    vegetation: &[VegetationFeature],
    policy: OverlapPolicy,
    engine: &E,
) -> f64 {
    let boundary_area = engine.area(boundary);
    if boundary_area <= 0.0 {
        return 0.0;
    }

    let clipped: Vec<MultiPolygon<f64>> = vegetation
        .iter()
        .filter(|feature| engine.intersects(&feature.geometry, boundary))
        .map(|feature| engine.intersection(&feature.geometry, boundary))
        .collect();

    if clipped.is_empty() {
        return 0.0;
    }

    let green_area = match policy {
        OverlapPolicy::SumIntersections => clipped
            .iter()
            .fold(0.0, |total, piece| total + engine.area(piece)),
        OverlapPolicy::UnionBeforeSum => {
            let merged = clipped
                .into_iter()
                .reduce(|acc, piece| engine.union(&acc, &piece))
                .unwrap_or_else(|| MultiPolygon::new(vec![]));
            engine.area(&merged)
        }
    };

    green_area / boundary_area
}
