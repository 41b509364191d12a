//! Grid geometry shared by all layers of a stack.
//!
//! A layer grid is described by its geographic extents, node increments,
//! node counts and registration. Every layer in a stack must carry the
//! same geometry within [`GEOM_TOL`]; the loader enforces this before it
//! reuses the first layer's boundary-condition parameters for the rest.

/// Absolute tolerance for geometry equality across layers.
pub const GEOM_TOL: f64 = 5e-7;

/// Number of padding cells on each side of a layer's data region.
///
/// The external boundary-condition machinery fills these cells so that
/// the 2-D interpolant can evaluate up to (and, for periodic axes,
/// across) the grid edges.
pub const GRID_PAD: usize = 2;

/// Geometry of one 2-D grid layer.
///
/// Extents are in the grid's native units (degrees for geographic
/// grids), increments are node spacings, and `pixel_registration`
/// distinguishes pixel from gridline node registration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridGeometry {
    /// Minimum x (western edge for geographic grids).
    pub x_min: f64,
    /// Maximum x (eastern edge).
    pub x_max: f64,
    /// Minimum y (southern edge).
    pub y_min: f64,
    /// Maximum y (northern edge).
    pub y_max: f64,
    /// Node spacing in x.
    pub x_inc: f64,
    /// Node spacing in y.
    pub y_inc: f64,
    /// Number of nodes in x.
    pub nx: usize,
    /// Number of nodes in y.
    pub ny: usize,
    /// Pixel (cell-centered) registration instead of gridline registration.
    pub pixel_registration: bool,
}

impl GridGeometry {
    /// Geometry of a gridline-registered grid covering the given extents.
    ///
    /// Node counts follow the registration convention:
    /// `nx = round((x_max - x_min) / x_inc) + 1` for gridline
    /// registration, without the `+ 1` for pixel registration.
    pub fn from_extents(
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
        x_inc: f64,
        y_inc: f64,
        pixel_registration: bool,
    ) -> Self {
        let one_or_zero = if pixel_registration { 0 } else { 1 };
        let nx = ((x_max - x_min) / x_inc).round() as usize + one_or_zero;
        let ny = ((y_max - y_min) / y_inc).round() as usize + one_or_zero;
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
            x_inc,
            y_inc,
            nx,
            ny,
            pixel_registration,
        }
    }

    /// Whether two geometries agree within [`GEOM_TOL`] on extents and
    /// increments, and exactly on node counts and registration.
    pub fn approx_eq(&self, other: &Self) -> bool {
        (self.x_min - other.x_min).abs() <= GEOM_TOL
            && (self.x_max - other.x_max).abs() <= GEOM_TOL
            && (self.y_min - other.y_min).abs() <= GEOM_TOL
            && (self.y_max - other.y_max).abs() <= GEOM_TOL
            && (self.x_inc - other.x_inc).abs() <= GEOM_TOL
            && (self.y_inc - other.y_inc).abs() <= GEOM_TOL
            && self.nx == other.nx
            && self.ny == other.ny
            && self.pixel_registration == other.pixel_registration
    }

    /// Padded row length (`nx` plus [`GRID_PAD`] cells each side).
    #[inline]
    pub fn padded_nx(&self) -> usize {
        self.nx + 2 * GRID_PAD
    }

    /// Padded column length.
    #[inline]
    pub fn padded_ny(&self) -> usize {
        self.ny + 2 * GRID_PAD
    }

    /// Number of cells in one padded layer.
    #[inline]
    pub fn padded_len(&self) -> usize {
        self.padded_nx() * self.padded_ny()
    }

    /// Check whether a point lies within the grid extents.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Whether the x range suggests a -180..180 rather than 0..360 system.
    pub fn has_negative_lon(&self) -> bool {
        self.x_min < 0.0 || self.x_max < 0.0
    }
}
