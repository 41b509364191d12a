//! Contiguous storage for all layers of a stack.
//!
//! All layers live in one flat buffer, addressed through a
//! bounds-checked `(layer, row, col)` accessor over the padded layer
//! shape. Keeping layers adjacent preserves memory locality when the
//! depth interpolator touches two neighboring layers per query.

use crate::types::GridGeometry;

/// One contiguous buffer holding every padded layer of a stack.
#[derive(Clone, Debug)]
pub struct LayerArena {
    data: Vec<f64>,
    n_layers: usize,
    /// Padded row length.
    padded_nx: usize,
    /// Padded column count.
    padded_ny: usize,
}

impl LayerArena {
    /// Allocate a zeroed arena for `n_layers` layers of `geom`'s padded shape.
    pub fn new(n_layers: usize, geom: &GridGeometry) -> Self {
        let padded_nx = geom.padded_nx();
        let padded_ny = geom.padded_ny();
        Self {
            data: vec![0.0; n_layers * padded_nx * padded_ny],
            n_layers,
            padded_nx,
            padded_ny,
        }
    }

    /// Number of layers.
    #[inline]
    pub fn n_layers(&self) -> usize {
        self.n_layers
    }

    /// Cells per padded layer.
    #[inline]
    pub fn layer_len(&self) -> usize {
        self.padded_nx * self.padded_ny
    }

    /// Flat index of `(layer, row, col)` in padded coordinates.
    ///
    /// # Panics
    /// Panics when any coordinate is out of range.
    #[inline]
    pub fn index(&self, layer: usize, row: usize, col: usize) -> usize {
        assert!(layer < self.n_layers, "layer {layer} out of {}", self.n_layers);
        assert!(row < self.padded_ny, "row {row} out of {}", self.padded_ny);
        assert!(col < self.padded_nx, "col {col} out of {}", self.padded_nx);
        (layer * self.padded_ny + row) * self.padded_nx + col
    }

    /// Value at `(layer, row, col)` in padded coordinates.
    #[inline]
    pub fn value(&self, layer: usize, row: usize, col: usize) -> f64 {
        self.data[self.index(layer, row, col)]
    }

    /// One padded layer as a slice.
    #[inline]
    pub fn layer(&self, layer: usize) -> &[f64] {
        let len = self.layer_len();
        let start = layer * len;
        &self.data[start..start + len]
    }

    /// One padded layer as a mutable slice.
    #[inline]
    pub fn layer_mut(&mut self, layer: usize) -> &mut [f64] {
        let len = self.layer_len();
        let start = layer * len;
        &mut self.data[start..start + len]
    }

    /// The whole buffer.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// The whole buffer, mutable.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Mean over one padded layer.
    pub fn layer_mean(&self, layer: usize) -> f64 {
        let slice = self.layer(layer);
        slice.iter().sum::<f64>() / slice.len() as f64
    }

    /// Root-mean-square over one padded layer.
    pub fn layer_rms(&self, layer: usize) -> f64 {
        let slice = self.layer(layer);
        (slice.iter().map(|v| v * v).sum::<f64>() / slice.len() as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    fn small_geom() -> GridGeometry {
        // 3 x 2 interior nodes, padded to 7 x 6.
        GridGeometry::from_extents(0.0, 2.0, 0.0, 1.0, 1.0, 1.0, false)
    }

    #[test]
    fn test_layout() {
        let arena = LayerArena::new(2, &small_geom());
        assert_eq!(arena.n_layers(), 2);
        assert_eq!(arena.layer_len(), 7 * 6);
        assert_eq!(arena.as_slice().len(), 2 * 7 * 6);
    }

    #[test]
    fn test_index_roundtrip() {
        let mut arena = LayerArena::new(2, &small_geom());
        let idx = arena.index(1, 3, 4);
        arena.as_mut_slice()[idx] = 7.5;
        assert!((arena.value(1, 3, 4) - 7.5).abs() < TOL);
        assert!((arena.layer(1)[3 * 7 + 4] - 7.5).abs() < TOL);
    }

    #[test]
    fn test_layers_are_disjoint() {
        let mut arena = LayerArena::new(2, &small_geom());
        arena.layer_mut(0).fill(1.0);
        arena.layer_mut(1).fill(2.0);
        assert!((arena.layer_mean(0) - 1.0).abs() < TOL);
        assert!((arena.layer_mean(1) - 2.0).abs() < TOL);
    }

    #[test]
    fn test_mean_and_rms() {
        let mut arena = LayerArena::new(1, &small_geom());
        arena.layer_mut(0).fill(-3.0);
        assert!((arena.layer_mean(0) - (-3.0)).abs() < TOL);
        assert!((arena.layer_rms(0) - 3.0).abs() < TOL);
    }

    #[test]
    #[should_panic(expected = "layer")]
    fn test_layer_bounds_checked() {
        let arena = LayerArena::new(1, &small_geom());
        let _ = arena.index(1, 0, 0);
    }

    #[test]
    #[should_panic(expected = "col")]
    fn test_col_bounds_checked() {
        let arena = LayerArena::new(1, &small_geom());
        let _ = arena.index(0, 0, 7);
    }
}
