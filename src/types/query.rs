//! Query point value type.

use crate::coords;

/// A normalized query location.
///
/// Longitude is in [0, 360), latitude in [-90, 90], depth in km with the
/// sign convention of the stack being sampled, and time in the same
/// units as the stage table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryPoint {
    /// Longitude in degrees, wrapped to [0, 360).
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Depth in km.
    pub depth: f64,
    /// Model time.
    pub time: f64,
}

impl QueryPoint {
    /// Query at a geographic location and depth, at time zero.
    pub fn new(lon: f64, lat: f64, depth: f64) -> Self {
        Self {
            lon: coords::wrap_lon_360(lon),
            lat,
            depth,
            time: 0.0,
        }
    }

    /// Query from spherical coordinates: normalized radius `r`,
    /// colatitude `theta` and longitude `phi`, both in radians.
    pub fn from_spherical(r: f64, theta: f64, phi: f64) -> Self {
        let (lon, lat) = coords::spherical_to_geo(theta, phi);
        Self {
            lon,
            lat,
            depth: coords::radius_to_depth_km(r),
            time: 0.0,
        }
    }

    /// Attach a query time.
    pub fn at_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }
}
