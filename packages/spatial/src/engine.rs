//! Geometry capability seam.
//!
//! The coverage and study-area computations only need four planar
//! operations plus reprojection. [`GeometryEngine`] names them so the
//! algorithms do not depend on a particular geometry library;
//! [`PlanarEngine`] implements them with the `geo` crate.

use geo::{Area, BooleanOps, BoundingRect, Intersects, MultiPolygon};

use crate::SpatialError;
use crate::projection::UtmZone;

/// Polygon operations used by the aggregation pipeline.
///
/// `intersects`, `intersection`, `union` and `area` expect planar
/// coordinates; `to_planar` and `to_geographic` move between WGS84 and
/// the engine's projected frame.
pub trait GeometryEngine {
    /// Whether two geometries share any point.
    fn intersects(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool;

    /// Exact intersection of two geometries.
    fn intersection(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64>;

    /// Exact union of two geometries.
    fn union(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64>;

    /// Unsigned planar area in square units of the frame.
    fn area(&self, geometry: &MultiPolygon<f64>) -> f64;

    /// Reprojects a WGS84 geometry into the planar frame.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if a vertex cannot be projected.
    fn to_planar(&self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, SpatialError>;

    /// Reprojects a planar geometry back to WGS84.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if a vertex cannot be converted.
    fn to_geographic(
        &self,
        geometry: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, SpatialError>;
}

/// `geo` backed engine working in a single UTM zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanarEngine {
    zone: UtmZone,
}

impl PlanarEngine {
    /// Creates an engine projecting into `zone`.
    #[must_use]
    pub const fn new(zone: UtmZone) -> Self {
        Self { zone }
    }

    /// The projected frame of this engine.
    #[must_use]
    pub const fn zone(&self) -> UtmZone {
        self.zone
    }
}

impl GeometryEngine for PlanarEngine {
    fn intersects(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
        // Envelope check first, exact test only for overlapping boxes.
        match (a.bounding_rect(), b.bounding_rect()) {
            (Some(ra), Some(rb)) => ra.intersects(&rb) && a.intersects(b),
            _ => false,
        }
    }

    fn intersection(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        a.intersection(b)
    }

    fn union(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        a.union(b)
    }

    fn area(&self, geometry: &MultiPolygon<f64>) -> f64 {
        geometry.unsigned_area()
    }

    fn to_planar(&self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, SpatialError> {
        self.zone.project(geometry)
    }

    fn to_geographic(
        &self,
        geometry: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, SpatialError> {
        self.zone.unproject(geometry)
    }
}
