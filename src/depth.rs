//! Depth-level table and linear depth interpolation.
//!
//! A 3-D stack carries one depth label per layer, read from a plain-text
//! file with one floating-point value per line. Labels must be strictly
//! ascending and there must be at least two of them.
//!
//! # File Format
//!
//! ```text
//! # comment lines and blank lines are skipped
//! 0.0
//! 50.0
//! 100.0
//! ```
//!
//! Whether depths are stored positive-down or negative-down is inferred
//! from the mean of the labels; see [`DepthLevels::negative_down`].

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::warn;

/// Error type for depth-level files.
#[derive(Debug, Error)]
pub enum DepthFileError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error with line number
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Fewer than two levels in a 3-D depth file
    #[error("Need at least two depth levels, found {count}")]
    TooFewLevels { count: usize },

    /// Levels not strictly increasing
    #[error("Depth levels must increase monotonically: level {index} is {value}, previous is {previous}")]
    NonMonotonic {
        index: usize,
        value: f64,
        previous: f64,
    },
}

/// Bracketing layer pair and linear weights for a query depth.
///
/// The sampled value is `fac1 * value(i1) + fac2 * value(i2)`. Under
/// extrapolation the weights leave [0, 1] but remain valid linear
/// extrapolation factors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthBracket {
    /// Lower bracketing layer index.
    pub i1: usize,
    /// Upper bracketing layer index (`i1 + 1`).
    pub i2: usize,
    /// Weight of layer `i1`.
    pub fac1: f64,
    /// Weight of layer `i2`.
    pub fac2: f64,
}

/// Strictly ascending depth labels for a grid stack.
#[derive(Debug)]
pub struct DepthLevels {
    /// Depth labels in km, strictly ascending.
    levels: Vec<f64>,
    /// Levels are stored negative-down (mean of labels <= 0).
    negative_down: bool,
    /// One-time extrapolation warning latch for this instance.
    warned: AtomicBool,
}

impl DepthLevels {
    /// Build from validated labels.
    ///
    /// # Errors
    /// - `TooFewLevels` if fewer than two labels are given
    /// - `NonMonotonic` if labels are not strictly increasing
    pub fn from_levels(levels: Vec<f64>) -> Result<Self, DepthFileError> {
        if levels.len() < 2 {
            return Err(DepthFileError::TooFewLevels {
                count: levels.len(),
            });
        }
        for i in 1..levels.len() {
            if levels[i] <= levels[i - 1] {
                return Err(DepthFileError::NonMonotonic {
                    index: i,
                    value: levels[i],
                    previous: levels[i - 1],
                });
            }
        }
        let mean = levels.iter().sum::<f64>() / levels.len() as f64;
        Ok(Self {
            levels,
            negative_down: mean <= 0.0,
            warned: AtomicBool::new(false),
        })
    }

    /// The implicit single level of a 2-D (single-layer) stack.
    pub fn single_layer() -> Self {
        Self {
            levels: vec![0.0],
            negative_down: false,
            warned: AtomicBool::new(false),
        }
    }

    /// Read a depth-level file: one value per line, blank lines and
    /// `#` comments skipped. With `change_sign`, each value is negated
    /// as it is read, before the monotonicity check.
    pub fn from_path(path: &Path, change_sign: bool) -> Result<Self, DepthFileError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut content = String::new();
        for line in reader.lines() {
            content.push_str(&line?);
            content.push('\n');
        }
        Self::parse(&content, change_sign)
    }

    /// Parse depth levels from a string. Same format as the file.
    pub fn parse(content: &str, change_sign: bool) -> Result<Self, DepthFileError> {
        let mut levels = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let value: f64 = line.parse().map_err(|_| DepthFileError::Parse {
                line: line_num + 1,
                message: format!("Invalid depth value '{line}'"),
            })?;
            levels.push(if change_sign { -value } else { value });
        }
        Self::from_levels(levels)
    }

    /// Number of levels.
    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// True for the degenerate single-level (2-D) table.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// The depth labels as a slice.
    #[inline]
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Smallest depth label.
    #[inline]
    pub fn z_min(&self) -> f64 {
        self.levels[0]
    }

    /// Largest depth label.
    #[inline]
    pub fn z_max(&self) -> f64 {
        self.levels[self.levels.len() - 1]
    }

    /// Whether depths are stored negative-down.
    ///
    /// Inferred from the sign of the mean label: a positive mean means
    /// depths are positive-down, otherwise negative-down. A level set
    /// balanced around zero resolves to negative-down; pass query depths
    /// in the matching convention.
    #[inline]
    pub fn negative_down(&self) -> bool {
        self.negative_down
    }

    /// Whether this table describes a multi-layer (3-D) stack.
    #[inline]
    pub fn is_three_d(&self) -> bool {
        self.levels.len() >= 2
    }

    /// Find the bracketing layer pair and linear weights for `depth`.
    ///
    /// `i2` is the smallest index whose label is `>= depth`, clamped to
    /// `[1, nz - 1]`; `i1 = i2 - 1`. Querying exactly at a stored level
    /// collapses the weights to one-hot. Depths outside the label range
    /// extrapolate: a warning is emitted once per instance and the
    /// (out-of-[0,1]) weights are still returned.
    pub fn bracket(&self, depth: f64) -> DepthBracket {
        debug_assert!(self.levels.len() >= 2, "bracket needs a 3-D level table");

        if (depth < self.z_min() || depth > self.z_max())
            && !self.warned.swap(true, Ordering::Relaxed)
        {
            warn!(
                z_min = self.z_min(),
                z_max = self.z_max(),
                depth, "depth value extrapolated outside the level range"
            );
        }

        let nzm1 = self.levels.len() - 1;
        let mut i2 = 0;
        while self.levels[i2] < depth && i2 < nzm1 {
            i2 += 1;
        }
        if i2 == 0 {
            i2 = 1;
        }
        let i1 = i2 - 1;

        let fac2 = (depth - self.levels[i1]) / (self.levels[i2] - self.levels[i1]);
        DepthBracket {
            i1,
            i2,
            fac1: 1.0 - fac2,
            fac2,
        }
    }
}
