//! Shared value types for grid sampling.
//!
//! - [`GridGeometry`] describes one layer's extents, increments and
//!   registration, with the tolerance-based equality the loader uses to
//!   enforce geometry consistency across layers.
//! - [`QueryPoint`] is a normalized query location (lon/lat/depth/time).

mod geometry;
mod query;

pub use geometry::{GridGeometry, GEOM_TOL, GRID_PAD};
pub use query::QueryPoint;
