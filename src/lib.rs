//! # grdstack
//!
//! Sampling of scalar fields defined on stacks of geographic grids, with
//! optional smooth blending between time-dependent model stages.
//!
//! This crate provides the orchestration layer used by geophysical
//! simulation codes that evaluate a 3-D (or time-evolving) property —
//! density anomaly, a velocity boundary condition — at arbitrary query
//! points without re-reading the gridded data per query:
//!
//! - Coordinate normalization (spherical or Cartesian queries to
//!   lon/lat/depth with periodic wraparound)
//! - Depth-layer stacking with geometry consistency enforcement and
//!   linear interpolation across layers
//! - Raised-cosine blending between ascending, gapless time stages
//! - A trait seam ([`grid::GridBackend`]) for the external library that
//!   parses grid files and evaluates the 2-D interpolant within a layer
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use std::sync::Arc;
//! use grdstack::grid::testdata::SyntheticBackend;
//! use grdstack::{GridStack, StageBlender, StageTable, StackConfig};
//!
//! // A single-layer global field.
//! let geom = SyntheticBackend::global_one_degree();
//! let backend = SyntheticBackend::new(geom, Arc::new(|lon, _, _| lon));
//! let mut stack = GridStack::new(backend);
//! let config = StackConfig {
//!     edge_flags: "g".into(), // global grid, periodic in longitude
//!     ..StackConfig::default()
//! };
//! stack.load(Path::new("field.grd"), &config).unwrap();
//!
//! // Blend weights between two tectonic stages.
//! let mut blender = StageBlender::new(
//!     StageTable::from_pairs(&[(0.0, 10.0), (10.0, 20.0)]).unwrap(),
//! );
//! let w = blender.weights(10.0).unwrap();
//! assert!((w.f1 - 0.5).abs() < 1e-12);
//! ```

pub mod coords;
pub mod depth;
pub mod grid;
pub mod stage;
pub mod types;

pub use depth::{DepthBracket, DepthFileError, DepthLevels};
pub use grid::{
    BackendError, BoundaryInfo, GridBackend, GridStack, InterpMode, LayerArena, SampleError,
    StackConfig, StackError, TransformError,
};
pub use stage::{
    BlendConfig, StageBlender, StageError, StageFileError, StageInterval, StageTable,
    StageWeights,
};
pub use types::{GridGeometry, QueryPoint, GEOM_TOL, GRID_PAD};
