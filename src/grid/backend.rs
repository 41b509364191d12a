//! External grid-library contract.
//!
//! Grid file parsing, boundary-condition filling and single-layer 2-D
//! interpolation are delegated to an external library behind the
//! [`GridBackend`] trait. The stack only needs the five operations
//! defined here; everything else the library can do is irrelevant to it.
//!
//! Boundary-condition parameters are computed once from the first layer
//! and reused for all layers — sound because the loader has already
//! enforced identical geometry across the stack.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::GridGeometry;

/// Error type for backend I/O and format failures.
#[derive(Debug, Error)]
pub enum BackendError {
    /// File I/O error
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Corrupt or unsupported grid file
    #[error("Bad grid file {path}: {message}")]
    Format { path: PathBuf, message: String },
}

/// 2-D interpolation kernel selection, fixed once at load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InterpMode {
    /// Bilinear interpolation.
    Bilinear,
    /// Bicubic interpolation (the default).
    #[default]
    Bicubic,
}

/// Periodicity derived from a grid's edge flags.
///
/// `nxp`/`nyp` are the number of nodes in one period along the axis,
/// zero when the axis is not periodic. The sampler folds out-of-range
/// coordinates back by whole periods (`increment * period_count`) before
/// giving up on a point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundaryInfo {
    /// Nodes per period in x; 0 when x is not periodic.
    pub nxp: usize,
    /// Nodes per period in y; 0 when y is not periodic.
    pub nyp: usize,
}

impl BoundaryInfo {
    /// Natural (non-periodic) edges on both axes.
    pub fn natural() -> Self {
        Self::default()
    }

    /// Derive periodicity from an edge-flags string.
    ///
    /// Flags follow the GMT `-L` convention: `g` marks a global
    /// geographic grid (periodic in x with a 360-degree period), `x` and
    /// `y` mark plain periodic axes spanning the grid extent. An empty
    /// string means natural edges. Backends can use this as their
    /// `prepare_boundary` or substitute their own parsing.
    pub fn parse(geom: &GridGeometry, edge_flags: &str) -> Self {
        let mut info = Self::natural();
        if edge_flags.contains('g') {
            info.nxp = (360.0 / geom.x_inc).round() as usize;
        }
        if edge_flags.contains('x') {
            info.nxp = ((geom.x_max - geom.x_min) / geom.x_inc).round() as usize;
        }
        if edge_flags.contains('y') {
            info.nyp = ((geom.y_max - geom.y_min) / geom.y_inc).round() as usize;
        }
        info
    }

    /// Whether x is periodic.
    #[inline]
    pub fn periodic_x(&self) -> bool {
        self.nxp > 0
    }

    /// Whether y is periodic.
    #[inline]
    pub fn periodic_y(&self) -> bool {
        self.nyp > 0
    }
}

/// The surface the stack requires from an external grid library.
///
/// Buffers handed to `read_data`, `apply_boundary` and `evaluate` are
/// single padded layers of `geom.padded_len()` cells, laid out row-major
/// with `pad` border cells on every side; `read_data` fills the interior
/// and `apply_boundary` fills every padding cell.
pub trait GridBackend {
    /// Read a grid file header.
    fn read_header(&self, path: &Path) -> Result<GridGeometry, BackendError>;

    /// Read a grid file's data into the interior of a padded layer buffer.
    fn read_data(
        &self,
        path: &Path,
        geom: &GridGeometry,
        pad: usize,
        out: &mut [f64],
    ) -> Result<(), BackendError>;

    /// Compute boundary-condition parameters for a geometry.
    fn prepare_boundary(
        &self,
        geom: &GridGeometry,
        edge_flags: &str,
    ) -> Result<BoundaryInfo, BackendError>;

    /// Fill the padding cells of a layer buffer in place.
    fn apply_boundary(
        &self,
        geom: &GridGeometry,
        boundary: &BoundaryInfo,
        pad: usize,
        data: &mut [f64],
    );

    /// Evaluate the 2-D interpolant at a point inside the grid extents.
    fn evaluate(
        &self,
        geom: &GridGeometry,
        boundary: &BoundaryInfo,
        data: &[f64],
        mode: InterpMode,
        lon: f64,
        lat: f64,
    ) -> f64;
}
