//! Grid stack: layer storage, the external-library seam, and sampling.
//!
//! This module provides:
//! - **[`GridBackend`]**: the contract an external grid library must
//!   satisfy (header/data reading, boundary-condition filling, 2-D
//!   point evaluation)
//! - **[`LayerArena`]**: one contiguous padded buffer for all layers
//! - **[`GridStack`]**: loading with geometry cross-validation, the
//!   one-time elementwise transform, and composed single-point sampling
//!   with periodic wrap and depth-layer blending
//! - **[`testdata`]**: a synthetic in-memory backend for tests and
//!   benchmarks
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use std::sync::Arc;
//! use grdstack::grid::testdata::SyntheticBackend;
//! use grdstack::grid::{GridStack, StackConfig};
//!
//! let geom = SyntheticBackend::global_one_degree();
//! let backend = SyntheticBackend::new(geom, Arc::new(|lon, lat, _| lon + lat));
//! let mut stack = GridStack::new(backend);
//! stack.load(Path::new("field.grd"), &StackConfig::default()).unwrap();
//!
//! let value = stack
//!     .sample(&grdstack::QueryPoint::new(10.0, 45.0, 0.0))
//!     .unwrap()
//!     .expect("point is inside the grid");
//! assert!((value - 55.0).abs() < 1e-9);
//! ```

mod arena;
mod backend;
mod stack;
pub mod testdata;

pub use arena::LayerArena;
pub use backend::{BackendError, BoundaryInfo, GridBackend, InterpMode};
pub use stack::{GridStack, SampleError, StackConfig, StackError, TransformError};
