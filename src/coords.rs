//! Coordinate normalization for grid queries.
//!
//! Queries arrive either in spherical coordinates (normalized radius r,
//! colatitude θ, longitude φ, angles in radians) or as raw Cartesian
//! triples that already carry (lon, lat, depth) meaning. This module
//! converts both into the grid system used by the sampler:
//!
//! ```text
//! lon   = φ · 180/π, wrapped into [0, 360)
//! lat   = 90 − θ · 180/π
//! depth = (1 − r) · 6371.0 km
//! ```
//!
//! Depth-sign adjustment for stacks whose levels are stored negative-down
//! is applied by the caller, which knows the stack convention.

use std::f64::consts::PI;

/// Mean Earth radius in km used for radius-to-depth conversion.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Degrees per radian.
const DEG_PER_RAD: f64 = 180.0 / PI;

/// Wrap a longitude in degrees into [0, 360).
///
/// Out-of-range values are folded by whole turns, so `-350` and `370`
/// both land at `10`.
#[inline]
pub fn wrap_lon_360(mut lon: f64) -> f64 {
    while lon < 0.0 {
        lon += 360.0;
    }
    while lon >= 360.0 {
        lon -= 360.0;
    }
    lon
}

/// Convert colatitude θ (radians, 0 at the north pole) to latitude in degrees.
#[inline]
pub fn colat_to_lat(theta: f64) -> f64 {
    90.0 - theta * DEG_PER_RAD
}

/// Convert a normalized radius to depth in km (positive down).
#[inline]
pub fn radius_to_depth_km(r: f64) -> f64 {
    (1.0 - r) * EARTH_RADIUS_KM
}

/// Convert spherical angles (θ colatitude, φ longitude, radians) to
/// geographic (lon, lat) in degrees, longitude wrapped to [0, 360).
#[inline]
pub fn spherical_to_geo(theta: f64, phi: f64) -> (f64, f64) {
    (wrap_lon_360(phi * DEG_PER_RAD), colat_to_lat(theta))
}
