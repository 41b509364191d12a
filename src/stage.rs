//! Time-stage table and smooth stage blending.
//!
//! A time-dependent model is described by ascending, gapless stage
//! intervals read from a plain-text file with two values per line:
//!
//! ```text
//! # t_start t_stop
//! 0.0 10.0
//! 10.0 20.0
//! ```
//!
//! Each interval also carries its midpoint. The blender assigns every
//! query time two stage indices and two weights that sum to one; away
//! from stage boundaries one weight is exactly 1, and across a boundary
//! the weights follow a raised-cosine ramp
//! `f2 = (1 - cos(pi s)) / 2`, which is continuous with continuous
//! derivative, so quantities derived from stage-blended fields never
//! jump.
//!
//! The blender caches the last query; repeated calls with the same time
//! (within 5e-7) skip recomputation. The cache is an explicit field of
//! each [`StageBlender`], so independent blenders never contaminate one
//! another; share one across threads only behind a lock.

use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

/// Tolerance for gap detection between intervals and for blend-cache hits.
pub const TIME_TOL: f64 = 5e-7;

/// Query times outside the table by up to this much are clamped to the
/// table range; beyond it the query fails.
pub const TIME_CLAMP_TOL: f64 = 0.1;

/// Error type for stage-interval files.
#[derive(Debug, Error)]
pub enum StageFileError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error with line number
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Empty file (no intervals)
    #[error("Stage file contains no time intervals")]
    Empty,

    /// Interval ends before it starts
    #[error("Interval at line {line} ends before it starts ({t_start} > {t_stop})")]
    Inverted {
        line: usize,
        t_start: f64,
        t_stop: f64,
    },

    /// Intervals out of order or with a gap between them
    #[error(
        "Intervals must ascend without gaps: line {line} starts at {t_start}, previous stops at {prev_stop}"
    )]
    NotContiguous {
        line: usize,
        t_start: f64,
        prev_stop: f64,
    },
}

/// Error type for stage-weight queries.
#[derive(Debug, Error)]
pub enum StageError {
    /// Query time beyond the clamp tolerance outside the table
    #[error("Time {time} outside the stage table range [{t_min}, {t_max}]")]
    TimeOutOfRange { time: f64, t_min: f64, t_max: f64 },
}

/// One stage interval with its midpoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageInterval {
    /// Start of the interval.
    pub t_start: f64,
    /// Midpoint, `(t_start + t_stop) / 2`.
    pub t_mid: f64,
    /// End of the interval.
    pub t_stop: f64,
}

impl StageInterval {
    fn new(t_start: f64, t_stop: f64) -> Self {
        Self {
            t_start,
            t_mid: (t_start + t_stop) / 2.0,
            t_stop,
        }
    }
}

/// Ascending, gapless sequence of stage intervals.
#[derive(Clone, Debug)]
pub struct StageTable {
    intervals: Vec<StageInterval>,
}

impl StageTable {
    /// The implicit static table: a single `(0, 0, 0)` interval.
    pub fn single() -> Self {
        Self {
            intervals: vec![StageInterval::new(0.0, 0.0)],
        }
    }

    /// Build from `(t_start, t_stop)` pairs with validation.
    ///
    /// # Errors
    /// - `Empty` if no pairs are given
    /// - `Inverted` if an interval ends before it starts
    /// - `NotContiguous` if intervals descend or leave a gap larger
    ///   than [`TIME_TOL`]
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, StageFileError> {
        if pairs.is_empty() {
            return Err(StageFileError::Empty);
        }
        let mut intervals: Vec<StageInterval> = Vec::with_capacity(pairs.len());
        for (i, &(ta, tb)) in pairs.iter().enumerate() {
            if tb < ta {
                return Err(StageFileError::Inverted {
                    line: i + 1,
                    t_start: ta,
                    t_stop: tb,
                });
            }
            if let Some(prev) = intervals.last() {
                let prev_stop = prev.t_stop;
                if (ta - prev_stop).abs() > TIME_TOL {
                    return Err(StageFileError::NotContiguous {
                        line: i + 1,
                        t_start: ta,
                        prev_stop,
                    });
                }
            }
            intervals.push(StageInterval::new(ta, tb));
        }
        Ok(Self { intervals })
    }

    /// Read a stage file: two values per line, blank lines and `#`
    /// comments skipped.
    pub fn from_path(path: &Path) -> Result<Self, StageFileError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut content = String::new();
        for line in reader.lines() {
            content.push_str(&line?);
            content.push('\n');
        }
        let table = Self::parse(&content)?;
        debug!(
            stages = table.len(),
            t_min = table.t_min(),
            t_max = table.t_max(),
            "read stage table"
        );
        Ok(table)
    }

    /// Parse stage intervals from a string. Same format as the file.
    pub fn parse(content: &str) -> Result<Self, StageFileError> {
        let mut pairs = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 2 {
                return Err(StageFileError::Parse {
                    line: line_num + 1,
                    message: "Expected: t_start t_stop".into(),
                });
            }
            let ta: f64 = parts[0].parse().map_err(|_| StageFileError::Parse {
                line: line_num + 1,
                message: "Invalid t_start value".into(),
            })?;
            let tb: f64 = parts[1].parse().map_err(|_| StageFileError::Parse {
                line: line_num + 1,
                message: "Invalid t_stop value".into(),
            })?;
            pairs.push((ta, tb));
        }
        Self::from_pairs(&pairs)
    }

    /// Number of stages.
    #[inline]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// A table is never empty; kept for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// True for the degenerate static (single-interval) table.
    #[inline]
    pub fn is_single(&self) -> bool {
        self.intervals.len() == 1
    }

    /// The intervals as a slice.
    #[inline]
    pub fn intervals(&self) -> &[StageInterval] {
        &self.intervals
    }

    /// Start of the first interval.
    #[inline]
    pub fn t_min(&self) -> f64 {
        self.intervals[0].t_start
    }

    /// End of the last interval.
    #[inline]
    pub fn t_max(&self) -> f64 {
        self.intervals[self.intervals.len() - 1].t_stop
    }
}

/// Blend weights for a query time.
///
/// The caller evaluates the field for stages `i1` and `i2` and combines
/// them as `f1 * value(i1) + f2 * value(i2)`; `f1 + f2 == 1` always.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageWeights {
    /// Left (earlier) stage index.
    pub i1: usize,
    /// Right (later) stage index.
    pub i2: usize,
    /// Weight of the left stage.
    pub f1: f64,
    /// Weight of the right stage.
    pub f2: f64,
}

/// Transition-band configuration for [`StageBlender`].
#[derive(Clone, Copy, Debug)]
pub struct BlendConfig {
    /// Full width of the raised-cosine transition band, in the
    /// normalized offset coordinate. Defaults to 0.01.
    pub transition_width: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            transition_width: 0.01,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct BlendCache {
    time: f64,
    weights: StageWeights,
}

/// Computes smoothly-varying blend weights between adjacent stages.
#[derive(Clone, Debug)]
pub struct StageBlender {
    table: StageTable,
    config: BlendConfig,
    cache: Option<BlendCache>,
}

impl StageBlender {
    /// Blender over a stage table with the default transition width.
    pub fn new(table: StageTable) -> Self {
        Self::with_config(table, BlendConfig::default())
    }

    /// Blender with an explicit transition-band configuration.
    pub fn with_config(table: StageTable, config: BlendConfig) -> Self {
        Self {
            table,
            config,
            cache: None,
        }
    }

    /// The underlying stage table.
    #[inline]
    pub fn table(&self) -> &StageTable {
        &self.table
    }

    /// Blend weights for `time`.
    ///
    /// A single-interval table always yields `(0, 0, 1.0, 0.0)`. For
    /// multi-interval tables, times up to [`TIME_CLAMP_TOL`] outside the
    /// table range are clamped to it; times further out fail with
    /// [`StageError::TimeOutOfRange`].
    pub fn weights(&mut self, time: f64) -> Result<StageWeights, StageError> {
        if self.table.is_single() {
            return Ok(StageWeights {
                i1: 0,
                i2: 0,
                f1: 1.0,
                f2: 0.0,
            });
        }

        if let Some(cache) = self.cache {
            if (time - cache.time).abs() <= TIME_TOL {
                return Ok(cache.weights);
            }
        }

        let t = self.clamp_time(time)?;
        let weights = self.compute_weights(t);
        self.cache = Some(BlendCache { time: t, weights });
        Ok(weights)
    }

    fn clamp_time(&self, time: f64) -> Result<f64, StageError> {
        let (t_min, t_max) = (self.table.t_min(), self.table.t_max());
        if time < t_min {
            if (time - t_min).abs() < TIME_CLAMP_TOL {
                return Ok(t_min);
            }
            return Err(StageError::TimeOutOfRange { time, t_min, t_max });
        }
        if time > t_max {
            if (time - t_max).abs() < TIME_CLAMP_TOL {
                return Ok(t_max);
            }
            return Err(StageError::TimeOutOfRange { time, t_min, t_max });
        }
        Ok(time)
    }

    fn compute_weights(&self, t: f64) -> StageWeights {
        let intervals = self.table.intervals();
        let n = intervals.len();

        // Smallest stage whose midpoint is >= t, clamped to [1, n - 1].
        let mut right = 0;
        while right < n - 1 && t > intervals[right].t_mid {
            right += 1;
        }
        if right == 0 {
            right = 1;
        }
        let left = right - 1;

        // Normalized offset from the stage boundary; zero exactly at the
        // boundary, scaled by the distance between the two midpoints.
        let boundary = intervals[right].t_start;
        let u = 2.0 * (t - boundary) / (intervals[right].t_mid - intervals[left].t_mid);

        let half_width = self.config.transition_width / 2.0;
        let (f1, f2) = if u < -half_width {
            (1.0, 0.0)
        } else if u > half_width {
            (0.0, 1.0)
        } else {
            let s = (u + half_width) / self.config.transition_width;
            let f2 = (1.0 - (s * PI).cos()) / 2.0;
            (1.0 - f2, f2)
        };

        StageWeights {
            i1: left,
            i2: right,
            f1,
            f2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TOL: f64 = 1e-12;

    fn two_stage_blender() -> StageBlender {
        StageBlender::new(StageTable::from_pairs(&[(0.0, 10.0), (10.0, 20.0)]).unwrap())
    }

    #[test]
    fn test_parse_simple_table() {
        let table = StageTable::parse("0.0 10.0\n10.0 20.0\n").unwrap();
        assert_eq!(table.len(), 2);
        assert!((table.t_min() - 0.0).abs() < TOL);
        assert!((table.t_max() - 20.0).abs() < TOL);
        assert!((table.intervals()[0].t_mid - 5.0).abs() < TOL);
        assert!((table.intervals()[1].t_mid - 15.0).abs() < TOL);
    }

    #[test]
    fn test_parse_rejects_gap() {
        let result = StageTable::parse("0.0 10.0\n11.0 20.0\n");
        assert!(matches!(result, Err(StageFileError::NotContiguous { .. })));
    }

    #[test]
    fn test_parse_rejects_overlap() {
        let result = StageTable::parse("0.0 10.0\n5.0 15.0\n");
        assert!(matches!(result, Err(StageFileError::NotContiguous { .. })));
    }

    #[test]
    fn test_parse_rejects_inverted() {
        let result = StageTable::parse("10.0 0.0\n");
        assert!(matches!(result, Err(StageFileError::Inverted { .. })));
    }

    #[test]
    fn test_parse_rejects_empty() {
        let result = StageTable::parse("# nothing here\n");
        assert!(matches!(result, Err(StageFileError::Empty)));
    }

    #[test]
    fn test_parse_error_has_line() {
        let result = StageTable::parse("0.0 10.0\n10.0\n");
        match result {
            Err(StageFileError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_gap_within_tolerance_accepted() {
        let table = StageTable::from_pairs(&[(0.0, 10.0), (10.0 + 1e-8, 20.0)]).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_single_table_weights_constant() {
        let mut blender = StageBlender::new(StageTable::single());
        for t in [-100.0, 0.0, 3.7, 1e6] {
            let w = blender.weights(t).unwrap();
            assert_eq!((w.i1, w.i2), (0, 0));
            assert!((w.f1 - 1.0).abs() < TOL);
            assert!(w.f2.abs() < TOL);
        }
    }

    #[test]
    fn test_boundary_gives_half_half() {
        let mut blender = two_stage_blender();
        let w = blender.weights(10.0).unwrap();
        assert_eq!((w.i1, w.i2), (0, 1));
        assert!((w.f1 - 0.5).abs() < TOL);
        assert!((w.f2 - 0.5).abs() < TOL);
    }

    #[test]
    fn test_outside_band_is_exact() {
        let mut blender = two_stage_blender();

        let w = blender.weights(2.0).unwrap();
        assert_eq!((w.f1, w.f2), (1.0, 0.0));

        let w = blender.weights(10.5).unwrap();
        assert_eq!((w.f1, w.f2), (0.0, 1.0));

        let w = blender.weights(19.0).unwrap();
        assert_eq!((w.f1, w.f2), (0.0, 1.0));
    }

    #[test]
    fn test_weights_sum_to_one_across_band() {
        let mut blender = two_stage_blender();
        // Transition band in time units: |u| <= 0.005 with the default
        // width and mid spacing 10 means |t - 10| <= 0.025.
        for k in 0..=50 {
            let t = 9.96 + 0.0016 * k as f64;
            let w = blender.weights(t).unwrap();
            assert!(
                (w.f1 + w.f2 - 1.0).abs() < TOL,
                "weights at t = {t} do not sum to one"
            );
        }
    }

    #[test]
    fn test_blend_is_monotonic_across_band() {
        let mut blender = two_stage_blender();
        let mut prev = -1.0;
        for k in 0..=100 {
            let t = 9.95 + 0.001 * k as f64;
            let w = blender.weights(t).unwrap();
            assert!(w.f2 >= prev - TOL, "f2 decreased at t = {t}");
            prev = w.f2;
        }
    }

    #[test]
    fn test_clamp_tolerance() {
        let mut blender = two_stage_blender();

        // Slightly outside the table: clamped.
        let w = blender.weights(-0.05).unwrap();
        assert_eq!((w.f1, w.f2), (1.0, 0.0));
        let w = blender.weights(20.05).unwrap();
        assert_eq!((w.f1, w.f2), (0.0, 1.0));

        // Far outside: hard error.
        assert!(matches!(
            blender.weights(-0.5),
            Err(StageError::TimeOutOfRange { .. })
        ));
        assert!(matches!(
            blender.weights(20.5),
            Err(StageError::TimeOutOfRange { .. })
        ));
    }

    #[test]
    fn test_cache_repeat_and_invalidate() {
        let mut blender = two_stage_blender();
        let w1 = blender.weights(10.0).unwrap();
        let w2 = blender.weights(10.0 + 1e-9).unwrap();
        assert_eq!(w1, w2);

        // A genuinely different time recomputes.
        let w3 = blender.weights(15.0).unwrap();
        assert_ne!(w1, w3);

        // And the cache tracks the newest query.
        let w4 = blender.weights(15.0).unwrap();
        assert_eq!(w3, w4);
    }

    #[test]
    fn test_independent_blenders_do_not_share_state() {
        let mut a = two_stage_blender();
        let mut b = two_stage_blender();
        let _ = a.weights(2.0).unwrap();
        let w = b.weights(10.0).unwrap();
        assert!((w.f1 - 0.5).abs() < TOL, "blender b saw a's cache");
    }

    #[test]
    fn test_three_stages_middle_boundary() {
        let table = StageTable::from_pairs(&[(0.0, 10.0), (10.0, 20.0), (20.0, 40.0)]).unwrap();
        let mut blender = StageBlender::new(table);

        let w = blender.weights(20.0).unwrap();
        assert_eq!((w.i1, w.i2), (1, 2));
        assert!((w.f1 - 0.5).abs() < TOL);

        // Deep inside the last stage.
        let w = blender.weights(35.0).unwrap();
        assert_eq!((w.i1, w.i2), (1, 2));
        assert_eq!((w.f1, w.f2), (0.0, 1.0));

        // Deep inside the first stage.
        let w = blender.weights(1.0).unwrap();
        assert_eq!((w.i1, w.i2), (0, 1));
        assert_eq!((w.f1, w.f2), (1.0, 0.0));
    }

    #[test]
    fn test_wider_transition_band() {
        let table = StageTable::from_pairs(&[(0.0, 10.0), (10.0, 20.0)]).unwrap();
        let mut blender = StageBlender::with_config(
            table,
            BlendConfig {
                transition_width: 0.2,
            },
        );
        // u at t = 10.25 is 0.05, inside the widened band.
        let w = blender.weights(10.25).unwrap();
        assert!(w.f2 > 0.5 && w.f2 < 1.0);
        assert!((w.f1 + w.f2 - 1.0).abs() < TOL);
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# stages").unwrap();
        writeln!(file, "0.0 5.0").unwrap();
        writeln!(file, "5.0 9.0").unwrap();

        let table = StageTable::from_path(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert!((table.t_max() - 9.0).abs() < TOL);
    }
}
