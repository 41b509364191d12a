//! Multi-layer grid stack: loading, validation, transforms and sampling.
//!
//! A [`GridStack`] owns an ordered sequence of layer grids (insertion
//! order is ascending depth), their shared geometry and boundary
//! parameters, and one contiguous padded buffer for all layer data. It
//! is built in two phases — [`GridStack::new`] then [`GridStack::load`]
//! — and is immutable afterwards except for the optional one-time
//! elementwise transform.
//!
//! Layer files follow the fixed collaborator contract: a single file for
//! a one-layer (2-D) stack, or `"<prefix>.<N>.grd"` for `N = 1..nz` in
//! the 3-D case.
//!
//! All I/O happens in `load`; sampling performs none and allocates
//! nothing.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::depth::{DepthFileError, DepthLevels};
use crate::grid::arena::LayerArena;
use crate::grid::backend::{BackendError, BoundaryInfo, GridBackend, InterpMode};
use crate::types::{GridGeometry, QueryPoint, GRID_PAD};

/// Error type for stack loading and configuration.
#[derive(Debug, Error)]
pub enum StackError {
    /// `load` called on an already-loaded stack
    #[error("Stack is already loaded; load may be called only once per instance")]
    AlreadyInitialized,

    /// 3-D load requested without a depth file
    #[error("A 3-D stack requires a depth-level file")]
    MissingDepthFile,

    /// Depth-level file problem
    #[error("Depth file error: {0}")]
    Depth(#[from] DepthFileError),

    /// Backend I/O or format problem
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A layer's geometry differs from the first layer's
    #[error("Grid {layer} of {n_layers} ({path}) has different dimensions or settings from the first")]
    GeometryMismatch {
        /// 1-based layer number, matching the file naming convention.
        layer: usize,
        n_layers: usize,
        path: PathBuf,
    },
}

/// Error type for sampling calls.
#[derive(Debug, Error)]
pub enum SampleError {
    /// Query against a stack that has not been loaded
    #[error("Stack is not loaded")]
    NotInitialized,

    /// 3-D entry point used on a single-layer stack
    #[error("Stack is not 3-D; single-layer stacks are sampled by (theta, phi) only")]
    NotThreeD,

    /// 2-D entry point used on a multi-layer stack
    #[error("Stack is 3-D; multi-layer stacks need a depth coordinate")]
    NotTwoD,
}

/// Error type for the elementwise transform.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Transform requested before `load`
    #[error("Stack is not loaded")]
    NotInitialized,

    /// log10 applied to non-positive data
    #[error("log10 of non-positive value {value} at layer {layer}, row {row}, col {col}")]
    NonPositive {
        layer: usize,
        row: usize,
        col: usize,
        value: f64,
    },
}

/// Load options for [`GridStack::load`].
#[derive(Clone, Debug)]
pub struct StackConfig {
    /// Load a multi-layer (3-D) stack instead of a single layer.
    pub three_d: bool,
    /// Depth-level file path; required when `three_d` is set.
    pub depth_file: Option<PathBuf>,
    /// Negate depth labels as they are read (depth > 0 to z < 0).
    pub change_depth_sign: bool,
    /// Edge flags handed to the backend's boundary preparation
    /// (GMT `-L` style; empty means natural edges).
    pub edge_flags: String,
    /// 2-D interpolation kernel, fixed for the life of the stack.
    pub interp: InterpMode,
    /// Log per-layer mean/RMS after loading.
    pub diagnostics: bool,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            three_d: false,
            depth_file: None,
            change_depth_sign: false,
            edge_flags: String::new(),
            interp: InterpMode::default(),
            diagnostics: false,
        }
    }
}

impl StackConfig {
    /// Config for a 3-D stack with the given depth-level file.
    pub fn three_d(depth_file: impl Into<PathBuf>) -> Self {
        Self {
            three_d: true,
            depth_file: Some(depth_file.into()),
            ..Self::default()
        }
    }
}

/// State that exists only after a successful `load`.
#[derive(Debug)]
struct Loaded {
    geometry: GridGeometry,
    boundary: BoundaryInfo,
    levels: DepthLevels,
    arena: LayerArena,
    interp: InterpMode,
}

/// Ordered stack of layer grids with shared geometry and sampling.
#[derive(Debug)]
pub struct GridStack<B: GridBackend> {
    backend: B,
    loaded: Option<Loaded>,
}

impl<B: GridBackend> GridStack<B> {
    /// An empty, unloaded stack over the given backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            loaded: None,
        }
    }

    /// Whether `load` has completed.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Load all layers from `path_or_prefix`.
    ///
    /// For a single-layer stack this is the grid file path; for a 3-D
    /// stack it is the prefix of the `"<prefix>.<N>.grd"` sequence, with
    /// one file per depth level.
    ///
    /// # Errors
    /// - `AlreadyInitialized` on a second call
    /// - `MissingDepthFile` / `Depth` for depth-level problems
    /// - `Backend` for unreadable or corrupt grid files
    /// - `GeometryMismatch` when a layer disagrees with the first
    pub fn load(&mut self, path_or_prefix: &Path, config: &StackConfig) -> Result<(), StackError> {
        if self.loaded.is_some() {
            return Err(StackError::AlreadyInitialized);
        }

        let levels = if config.three_d {
            let depth_file = config
                .depth_file
                .as_deref()
                .ok_or(StackError::MissingDepthFile)?;
            let levels = DepthLevels::from_path(depth_file, config.change_depth_sign)?;
            info!(
                levels = levels.len(),
                z_min = levels.z_min(),
                z_max = levels.z_max(),
                file = %depth_file.display(),
                "read depth levels"
            );
            levels
        } else {
            DepthLevels::single_layer()
        };
        let n_layers = levels.len();

        // Read and cross-check every header before touching any data.
        let paths: Vec<PathBuf> = (0..n_layers)
            .map(|i| layer_path(path_or_prefix, i, n_layers))
            .collect();
        let geometry = self.backend.read_header(&paths[0])?;
        if geometry.has_negative_lon() {
            warn!(
                x_min = geometry.x_min,
                x_max = geometry.x_max,
                "geographic grids should be in the 0..360 longitude system"
            );
        }
        for (i, path) in paths.iter().enumerate().skip(1) {
            let other = self.backend.read_header(path)?;
            if !geometry.approx_eq(&other) {
                return Err(StackError::GeometryMismatch {
                    layer: i + 1,
                    n_layers,
                    path: path.clone(),
                });
            }
        }

        // Boundary parameters come from the first layer only; the
        // geometry check above is what makes reusing them sound.
        let boundary = self
            .backend
            .prepare_boundary(&geometry, &config.edge_flags)?;

        let mut arena = LayerArena::new(n_layers, &geometry);
        for (i, path) in paths.iter().enumerate() {
            self.backend
                .read_data(path, &geometry, GRID_PAD, arena.layer_mut(i))?;
            self.backend
                .apply_boundary(&geometry, &boundary, GRID_PAD, arena.layer_mut(i));
        }

        if config.diagnostics {
            for i in 0..n_layers {
                info!(
                    layer = i + 1,
                    depth = levels.levels()[i],
                    mean = arena.layer_mean(i),
                    rms = arena.layer_rms(i),
                    "loaded layer"
                );
            }
        }

        self.loaded = Some(Loaded {
            geometry,
            boundary,
            levels,
            arena,
            interp: config.interp,
        });
        Ok(())
    }

    /// Elementwise transform over the whole buffer, applied in the fixed
    /// order: base-10 logarithm, then `10^x`, then linear rescale.
    ///
    /// When `take_log10` is requested, the whole buffer is validated for
    /// positivity before anything is mutated, so a failing transform
    /// leaves the data untouched.
    pub fn apply_transform(
        &mut self,
        take_log10: bool,
        take_pow10: bool,
        rescale: Option<f64>,
    ) -> Result<(), TransformError> {
        let loaded = self.loaded.as_mut().ok_or(TransformError::NotInitialized)?;
        let arena = &mut loaded.arena;

        if take_log10 {
            let layer_len = arena.layer_len();
            let padded_nx = loaded.geometry.padded_nx();
            if let Some((idx, &value)) = arena
                .as_slice()
                .iter()
                .enumerate()
                .find(|(_, v)| **v <= 0.0)
            {
                return Err(TransformError::NonPositive {
                    layer: idx / layer_len,
                    row: (idx % layer_len) / padded_nx,
                    col: idx % padded_nx,
                    value,
                });
            }
        }

        for v in arena.as_mut_slice() {
            if take_log10 {
                *v = v.log10();
            }
            if take_pow10 {
                *v = 10f64.powf(*v);
            }
            if let Some(scale) = rescale {
                *v *= scale;
            }
        }
        Ok(())
    }

    /// Sample at a normalized query point.
    ///
    /// `point.depth` must already follow the stack's depth-sign
    /// convention; the spherical and Cartesian entry points below handle
    /// that adjustment. `Ok(None)` means the point is outside a
    /// non-periodic axis range after wrap attempts — a normal outcome,
    /// not an error.
    pub fn sample(&self, point: &QueryPoint) -> Result<Option<f64>, SampleError> {
        let loaded = self.loaded.as_ref().ok_or(SampleError::NotInitialized)?;
        Ok(self.sample_loaded(loaded, point.lon, point.lat, point.depth))
    }

    /// Sample a 3-D stack at spherical coordinates: normalized radius
    /// `r`, colatitude `theta` and longitude `phi` in radians.
    pub fn sample_rtp(&self, r: f64, theta: f64, phi: f64) -> Result<Option<f64>, SampleError> {
        let loaded = self.require_three_d()?;
        let (lon, lat) = crate::coords::spherical_to_geo(theta, phi);
        let mut depth = crate::coords::radius_to_depth_km(r);
        if loaded.levels.negative_down() {
            depth = -depth;
        }
        Ok(self.sample_loaded(loaded, lon, lat, depth))
    }

    /// Sample a 3-D stack at raw `(x, y, z)` understood as
    /// `(lon, lat, depth)`.
    pub fn sample_xyz(&self, x: f64, y: f64, z: f64) -> Result<Option<f64>, SampleError> {
        let loaded = self.require_three_d()?;
        let depth = if loaded.levels.negative_down() { -z } else { z };
        Ok(self.sample_loaded(loaded, x, y, depth))
    }

    /// Sample a single-layer stack at colatitude `theta` and longitude
    /// `phi` in radians.
    pub fn sample_tp(&self, theta: f64, phi: f64) -> Result<Option<f64>, SampleError> {
        let loaded = self.loaded.as_ref().ok_or(SampleError::NotInitialized)?;
        if loaded.levels.is_three_d() {
            return Err(SampleError::NotTwoD);
        }
        let (lon, lat) = crate::coords::spherical_to_geo(theta, phi);
        Ok(self.sample_loaded(loaded, lon, lat, 0.0))
    }

    fn require_three_d(&self) -> Result<&Loaded, SampleError> {
        let loaded = self.loaded.as_ref().ok_or(SampleError::NotInitialized)?;
        if !loaded.levels.is_three_d() {
            return Err(SampleError::NotThreeD);
        }
        Ok(loaded)
    }

    /// Periodic wrap, bracket selection and layer evaluation.
    fn sample_loaded(&self, loaded: &Loaded, lon: f64, lat: f64, depth: f64) -> Option<f64> {
        let geom = &loaded.geometry;
        let bnd = &loaded.boundary;

        let lat = wrap_axis(lat, geom.y_min, geom.y_max, geom.y_inc, bnd.nyp)?;
        let lon = wrap_axis(lon, geom.x_min, geom.x_max, geom.x_inc, bnd.nxp)?;

        let value = if loaded.levels.is_three_d() {
            let b = loaded.levels.bracket(depth);
            let val1 = self.backend.evaluate(
                geom,
                bnd,
                loaded.arena.layer(b.i1),
                loaded.interp,
                lon,
                lat,
            );
            let val2 = self.backend.evaluate(
                geom,
                bnd,
                loaded.arena.layer(b.i2),
                loaded.interp,
                lon,
                lat,
            );
            b.fac1 * val1 + b.fac2 * val2
        } else {
            self.backend
                .evaluate(geom, bnd, loaded.arena.layer(0), loaded.interp, lon, lat)
        };
        Some(value)
    }

    /// Shared layer geometry. `None` before `load`.
    pub fn geometry(&self) -> Option<&GridGeometry> {
        self.loaded.as_ref().map(|l| &l.geometry)
    }

    /// Boundary parameters shared by all layers. `None` before `load`.
    pub fn boundary(&self) -> Option<&BoundaryInfo> {
        self.loaded.as_ref().map(|l| &l.boundary)
    }

    /// Depth-level table. `None` before `load`.
    pub fn levels(&self) -> Option<&DepthLevels> {
        self.loaded.as_ref().map(|l| &l.levels)
    }

    /// Number of layers; zero before `load`.
    pub fn n_layers(&self) -> usize {
        self.loaded.as_ref().map_or(0, |l| l.arena.n_layers())
    }

    /// Whether this stack has two or more depth layers.
    pub fn is_three_d(&self) -> bool {
        self.loaded
            .as_ref()
            .is_some_and(|l| l.levels.is_three_d())
    }

    /// Mean of one padded layer's values.
    pub fn layer_mean(&self, layer: usize) -> Option<f64> {
        self.loaded.as_ref().map(|l| l.arena.layer_mean(layer))
    }

    /// RMS of one padded layer's values.
    pub fn layer_rms(&self, layer: usize) -> Option<f64> {
        self.loaded.as_ref().map(|l| l.arena.layer_rms(layer))
    }
}

/// Layer file naming: the path itself for a single layer, otherwise
/// `"<prefix>.<N>.grd"` with 1-based `N`.
fn layer_path(prefix: &Path, layer: usize, n_layers: usize) -> PathBuf {
    if n_layers == 1 {
        prefix.to_path_buf()
    } else {
        PathBuf::from(format!("{}.{}.grd", prefix.display(), layer + 1))
    }
}

/// Fold a coordinate into `[min, max]` by whole periods when the axis is
/// periodic; `None` when it stays outside.
fn wrap_axis(mut x: f64, min: f64, max: f64, inc: f64, period_nodes: usize) -> Option<f64> {
    let period = inc * period_nodes as f64;
    while x < min && period_nodes > 0 {
        x += period;
    }
    if x < min {
        return None;
    }
    while x > max && period_nodes > 0 {
        x -= period;
    }
    if x > max {
        return None;
    }
    Some(x)
}
