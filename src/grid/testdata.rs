//! Synthetic backend for tests and benchmarks.
//!
//! Provides an in-memory [`GridBackend`] whose "files" are generated
//! from an analytic field function, so unit and integration tests can
//! exercise the full load-and-sample path without any grid files on
//! disk. The evaluator is plain bilinear interpolation over interior
//! nodes regardless of the requested mode, which is enough to verify
//! the orchestration around it: a field linear in lon and lat is
//! reproduced exactly.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::grid::backend::{BackendError, BoundaryInfo, GridBackend, InterpMode};
use crate::types::{GridGeometry, GRID_PAD};

/// Analytic field: `(lon, lat, layer) -> value`.
pub type FieldFn = Arc<dyn Fn(f64, f64, usize) -> f64 + Send + Sync>;

/// In-memory grid backend generating layer data from an analytic field.
#[derive(Clone)]
pub struct SyntheticBackend {
    geometry: GridGeometry,
    field: FieldFn,
    /// Per-layer geometry overrides, keyed by 1-based file number, for
    /// exercising the loader's geometry cross-check.
    overrides: Vec<(usize, GridGeometry)>,
}

impl fmt::Debug for SyntheticBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticBackend")
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}

impl SyntheticBackend {
    /// Backend over `geometry` with the given field function.
    pub fn new(geometry: GridGeometry, field: FieldFn) -> Self {
        Self {
            geometry,
            field,
            overrides: Vec::new(),
        }
    }

    /// Backend whose layers all hold one constant value.
    pub fn constant(geometry: GridGeometry, value: f64) -> Self {
        Self::new(geometry, Arc::new(move |_, _, _| value))
    }

    /// Global 1-degree gridline-registered geometry, 0..360 by -90..90.
    pub fn global_one_degree() -> GridGeometry {
        GridGeometry::from_extents(0.0, 360.0, -90.0, 90.0, 1.0, 1.0, false)
    }

    /// Report a different geometry for one layer file (1-based number).
    pub fn with_layer_geometry(mut self, layer: usize, geometry: GridGeometry) -> Self {
        self.overrides.push((layer, geometry));
        self
    }

    /// 1-based layer number from a `"<prefix>.<N>.grd"` path; single
    /// files count as layer 1.
    fn layer_number(path: &Path) -> usize {
        let name = path.to_string_lossy();
        name.strip_suffix(".grd")
            .and_then(|stem| stem.rsplit('.').next())
            .and_then(|n| n.parse().ok())
            .unwrap_or(1)
    }
}

impl GridBackend for SyntheticBackend {
    fn read_header(&self, path: &Path) -> Result<GridGeometry, BackendError> {
        let layer = Self::layer_number(path);
        for (n, geom) in &self.overrides {
            if *n == layer {
                return Ok(*geom);
            }
        }
        Ok(self.geometry)
    }

    fn read_data(
        &self,
        path: &Path,
        geom: &GridGeometry,
        pad: usize,
        out: &mut [f64],
    ) -> Result<(), BackendError> {
        if out.len() != geom.padded_len() {
            return Err(BackendError::Format {
                path: path.to_path_buf(),
                message: format!(
                    "buffer length {} does not match padded grid size {}",
                    out.len(),
                    geom.padded_len()
                ),
            });
        }
        let layer = Self::layer_number(path) - 1;
        let stride = geom.padded_nx();
        for iy in 0..geom.ny {
            let lat = geom.y_min + iy as f64 * geom.y_inc;
            for ix in 0..geom.nx {
                let lon = geom.x_min + ix as f64 * geom.x_inc;
                out[(pad + iy) * stride + pad + ix] = (self.field)(lon, lat, layer);
            }
        }
        Ok(())
    }

    fn prepare_boundary(
        &self,
        geom: &GridGeometry,
        edge_flags: &str,
    ) -> Result<BoundaryInfo, BackendError> {
        Ok(BoundaryInfo::parse(geom, edge_flags))
    }

    fn apply_boundary(
        &self,
        geom: &GridGeometry,
        boundary: &BoundaryInfo,
        pad: usize,
        data: &mut [f64],
    ) {
        // Fill padding cells from the interior: wrapped for periodic
        // axes, clamped (natural edge) otherwise.
        let stride = geom.padded_nx();
        let (nx, ny) = (geom.nx as isize, geom.ny as isize);
        let pad = pad as isize;
        for row in 0..geom.padded_ny() as isize {
            for col in 0..stride as isize {
                let mut iy = row - pad;
                let mut ix = col - pad;
                let interior = (0..ny).contains(&iy) && (0..nx).contains(&ix);
                if interior {
                    continue;
                }
                if boundary.periodic_y() {
                    iy = iy.rem_euclid(boundary.nyp as isize).min(ny - 1);
                } else {
                    iy = iy.clamp(0, ny - 1);
                }
                if boundary.periodic_x() {
                    ix = ix.rem_euclid(boundary.nxp as isize).min(nx - 1);
                } else {
                    ix = ix.clamp(0, nx - 1);
                }
                data[(row * stride as isize + col) as usize] =
                    data[((iy + pad) * stride as isize + ix + pad) as usize];
            }
        }
    }

    fn evaluate(
        &self,
        geom: &GridGeometry,
        _boundary: &BoundaryInfo,
        data: &[f64],
        _mode: InterpMode,
        lon: f64,
        lat: f64,
    ) -> f64 {
        debug_assert!(geom.nx >= 2 && geom.ny >= 2);
        let (ix, tx) = lower_node((lon - geom.x_min) / geom.x_inc, geom.nx);
        let (iy, ty) = lower_node((lat - geom.y_min) / geom.y_inc, geom.ny);

        let stride = geom.padded_nx();
        let at = |iy: usize, ix: usize| data[(GRID_PAD + iy) * stride + GRID_PAD + ix];

        (1.0 - tx) * (1.0 - ty) * at(iy, ix)
            + tx * (1.0 - ty) * at(iy, ix + 1)
            + (1.0 - tx) * ty * at(iy + 1, ix)
            + tx * ty * at(iy + 1, ix + 1)
    }
}

/// Lower node index and fractional offset for a normalized coordinate,
/// clamped so `(index, index + 1)` stays inside `0..n`.
fn lower_node(f: f64, n: usize) -> (usize, f64) {
    let max_lower = (n - 2) as f64;
    let i = f.floor().clamp(0.0, max_lower);
    (i as usize, f - i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::stack::{GridStack, StackConfig};

    const TOL: f64 = 1e-9;

    #[test]
    fn test_layer_number_parsing() {
        assert_eq!(SyntheticBackend::layer_number(Path::new("dens.3.grd")), 3);
        assert_eq!(SyntheticBackend::layer_number(Path::new("dens.12.grd")), 12);
        assert_eq!(SyntheticBackend::layer_number(Path::new("field.grd")), 1);
        assert_eq!(SyntheticBackend::layer_number(Path::new("field")), 1);
    }

    #[test]
    fn test_lower_node_clamps() {
        let (i, t) = lower_node(0.0, 4);
        assert_eq!(i, 0);
        assert!(t.abs() < TOL);

        // Exactly at the last node: lower index pulls back one cell.
        let (i, t) = lower_node(3.0, 4);
        assert_eq!(i, 2);
        assert!((t - 1.0).abs() < TOL);

        let (i, t) = lower_node(1.5, 4);
        assert_eq!(i, 1);
        assert!((t - 0.5).abs() < TOL);
    }

    #[test]
    fn test_bilinear_reproduces_linear_field() {
        let geom = SyntheticBackend::global_one_degree();
        let backend =
            SyntheticBackend::new(geom, Arc::new(|lon, lat, _| 2.0 * lon - 0.5 * lat + 3.0));
        let mut stack = GridStack::new(backend);
        stack
            .load(Path::new("field.grd"), &StackConfig::default())
            .unwrap();

        for (lon, lat) in [(0.0, -90.0), (10.25, 42.5), (359.75, 89.9), (180.0, 0.0)] {
            let expected = 2.0 * lon - 0.5 * lat + 3.0;
            let got = stack
                .sample(&crate::types::QueryPoint::new(lon, lat, 0.0))
                .unwrap()
                .expect("inside domain");
            assert!(
                (got - expected).abs() < TOL,
                "bilinear at ({lon}, {lat}): {got} != {expected}"
            );
        }
    }

    #[test]
    fn test_geometry_override() {
        let geom = SyntheticBackend::global_one_degree();
        let other = GridGeometry::from_extents(0.0, 180.0, -90.0, 90.0, 1.0, 1.0, false);
        let backend = SyntheticBackend::constant(geom, 1.0).with_layer_geometry(2, other);

        assert_eq!(
            backend.read_header(Path::new("f.1.grd")).unwrap().nx,
            geom.nx
        );
        assert_eq!(
            backend.read_header(Path::new("f.2.grd")).unwrap().nx,
            other.nx
        );
    }
}
