//! WGS84 <-> UTM transverse Mercator projection.
//!
//! Uses the third-order Krüger series in the flattening `n`, which is
//! accurate to well below a millimetre inside a UTM zone. Area
//! arithmetic must happen in projected metres, never in degrees.

use geo::{Coord, MapCoords, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::SpatialError;

/// WGS84 semi-major axis in metres.
const WGS84_A: f64 = 6_378_137.0;

/// WGS84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// UTM central scale factor.
const UTM_K0: f64 = 0.9996;

/// UTM false easting in metres.
const FALSE_EASTING: f64 = 500_000.0;

/// False northing applied in the southern hemisphere.
const SOUTH_FALSE_NORTHING: f64 = 10_000_000.0;

/// A UTM zone, e.g. `33N` (EPSG:32633).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmZone {
    /// Zone number, 1-60.
    pub zone: u8,
    /// Northern hemisphere.
    pub north: bool,
}

impl Default for UtmZone {
    fn default() -> Self {
        Self {
            zone: 33,
            north: true,
        }
    }
}

impl std::fmt::Display for UtmZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UTM {}{}", self.zone, if self.north { 'N' } else { 'S' })
    }
}

/// Series coefficients derived from the ellipsoid.
struct Series {
    /// Rectifying radius.
    a: f64,
    n: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
}

impl Series {
    fn wgs84() -> Self {
        let n = WGS84_F / (2.0 - WGS84_F);
        let n2 = n * n;
        let n3 = n2 * n;

        Self {
            a: WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
            n,
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
                n2 / 48.0 + n3 / 15.0,
                17.0 * n3 / 480.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
                56.0 * n3 / 15.0,
            ],
        }
    }
}

/// Harmonic multiplier `2j` for the j-th (1-based) series term.
#[allow(clippy::cast_precision_loss)]
const fn harmonic(j: usize) -> f64 {
    (2 * (j + 1)) as f64
}

impl UtmZone {
    /// Creates a zone after range-checking the zone number.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Projection`] if `zone` is not in 1-60.
    pub fn new(zone: u8, north: bool) -> Result<Self, SpatialError> {
        if !(1..=60).contains(&zone) {
            return Err(SpatialError::Projection {
                message: format!("UTM zone {zone} out of range (1-60)"),
            });
        }
        Ok(Self { zone, north })
    }

    /// Picks the standard zone containing a WGS84 position.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn for_position(lon: f64, lat: f64) -> Self {
        let zone = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8;
        Self {
            zone,
            north: lat >= 0.0,
        }
    }

    /// Central meridian of the zone in degrees.
    #[must_use]
    pub fn central_meridian(self) -> f64 {
        f64::from(self.zone) * 6.0 - 183.0
    }

    const fn false_northing(self) -> f64 {
        if self.north { 0.0 } else { SOUTH_FALSE_NORTHING }
    }

    /// Projects a WGS84 longitude/latitude to UTM easting/northing.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Projection`] for latitudes outside the UTM
    /// range (-80, 84) or non-finite input.
    pub fn forward(self, lon: f64, lat: f64) -> Result<(f64, f64), SpatialError> {
        if !lon.is_finite() || !(-80.0..=84.0).contains(&lat) {
            return Err(SpatialError::Projection {
                message: format!("Position ({lon}, {lat}) outside the UTM domain"),
            });
        }

        let s = Series::wgs84();
        let phi = lat.to_radians();
        let dlambda = (lon - self.central_meridian()).to_radians();

        let c = 2.0 * s.n.sqrt() / (1.0 + s.n);
        let t = (phi.sin().atanh() - c * (c * phi.sin()).atanh()).sinh();
        let xi_p = t.atan2(dlambda.cos());
        let eta_p = (dlambda.sin() / t.mul_add(t, 1.0).sqrt()).atanh();

        let mut easting = eta_p;
        let mut northing = xi_p;
        for (j, alpha) in s.alpha.iter().enumerate() {
            let k = harmonic(j);
            easting += alpha * (k * xi_p).cos() * (k * eta_p).sinh();
            northing += alpha * (k * xi_p).sin() * (k * eta_p).cosh();
        }

        Ok((
            UTM_K0.mul_add(s.a * easting, FALSE_EASTING),
            UTM_K0.mul_add(s.a * northing, self.false_northing()),
        ))
    }

    /// Converts UTM easting/northing back to WGS84 longitude/latitude.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Projection`] for non-finite input.
    pub fn inverse(self, easting: f64, northing: f64) -> Result<(f64, f64), SpatialError> {
        if !easting.is_finite() || !northing.is_finite() {
            return Err(SpatialError::Projection {
                message: format!("Non-finite UTM position ({easting}, {northing})"),
            });
        }

        let s = Series::wgs84();
        let xi = (northing - self.false_northing()) / (UTM_K0 * s.a);
        let eta = (easting - FALSE_EASTING) / (UTM_K0 * s.a);

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, beta) in s.beta.iter().enumerate() {
            let k = harmonic(j);
            xi_p -= beta * (k * xi).sin() * (k * eta).cosh();
            eta_p -= beta * (k * xi).cos() * (k * eta).sinh();
        }

        let chi = (xi_p.sin() / eta_p.cosh()).asin();
        let mut phi = chi;
        for (j, delta) in s.delta.iter().enumerate() {
            phi += delta * (harmonic(j) * chi).sin();
        }

        let lon = self.central_meridian() + eta_p.sinh().atan2(xi_p.cos()).to_degrees();
        Ok((lon, phi.to_degrees()))
    }

    /// Projects every vertex of a WGS84 geometry into this zone.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Projection`] if any vertex is outside the
    /// UTM domain.
    pub fn project(self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, SpatialError> {
        geometry.try_map_coords(move |c| {
            self.forward(c.x, c.y).map(|(x, y)| Coord { x, y })
        })
    }

    /// Converts every vertex of a projected geometry back to WGS84.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Projection`] on non-finite coordinates.
    pub fn unproject(
        self,
        geometry: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, SpatialError> {
        geometry.try_map_coords(move |c| {
            self.inverse(c.x, c.y).map(|(x, y)| Coord { x, y })
        })
    }
}
