//! Uniform 1-D binning.

use serde::{Deserialize, Serialize};

use sp_core::{Error, Result};

/// Uniform binning over a fixed axis range.
///
/// Bin `i` (0-based) covers `[low_edge(i), low_edge(i+1))`; the last bin is
/// closed on the right. Under/overflow live outside this range and are
/// tracked by [`crate::Histogram1d`], not by the axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Number of regular bins.
    pub n_bins: usize,
    /// Lower edge of the first bin.
    pub x_min: f64,
    /// Upper edge of the last bin.
    pub x_max: f64,
}

impl Axis {
    /// Create a uniform axis. Rejects a degenerate range or zero bins.
    pub fn new(n_bins: usize, x_min: f64, x_max: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::Validation("axis must have at least 1 bin".to_string()));
        }
        if !(x_min.is_finite() && x_max.is_finite()) {
            return Err(Error::Validation("axis range must be finite".to_string()));
        }
        if x_max <= x_min {
            return Err(Error::Validation(format!(
                "axis range must satisfy x_max > x_min, got [{}, {}]",
                x_min, x_max
            )));
        }
        Ok(Self { n_bins, x_min, x_max })
    }

    /// Width of every bin (uniform binning).
    pub fn bin_width(&self) -> f64 {
        (self.x_max - self.x_min) / self.n_bins as f64
    }

    /// Lower edge of bin `i` (0-based). `i == n_bins` yields `x_max`.
    pub fn low_edge(&self, i: usize) -> f64 {
        self.x_min + self.bin_width() * i as f64
    }

    /// Center of bin `i` (0-based).
    pub fn center(&self, i: usize) -> f64 {
        self.x_min + self.bin_width() * (i as f64 + 0.5)
    }

    /// All `n_bins + 1` edges.
    pub fn edges(&self) -> Vec<f64> {
        (0..=self.n_bins).map(|i| self.low_edge(i)).collect()
    }

    /// Bin index for `x`, or `None` for under/overflow.
    ///
    /// The last bin is closed on the right, so `x == x_max` lands in bin
    /// `n_bins - 1`.
    pub fn find_bin(&self, x: f64) -> Option<usize> {
        if !x.is_finite() || x < self.x_min || x > self.x_max {
            return None;
        }
        if x == self.x_max {
            return Some(self.n_bins - 1);
        }
        let i = ((x - self.x_min) / self.bin_width()) as usize;
        Some(i.min(self.n_bins - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_rejects_bad_range() {
        assert!(Axis::new(10, 1.0, 0.0).is_err());
        assert!(Axis::new(0, 0.0, 1.0).is_err());
        assert!(Axis::new(10, 0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_edges_and_centers() {
        let axis = Axis::new(4, 0.0, 2.0).unwrap();
        assert_eq!(axis.bin_width(), 0.5);
        assert_eq!(axis.edges(), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(axis.center(0), 0.25);
        assert_eq!(axis.center(3), 1.75);
    }

    #[test]
    fn test_find_bin() {
        let axis = Axis::new(4, 0.0, 2.0).unwrap();
        assert_eq!(axis.find_bin(-0.1), None);
        assert_eq!(axis.find_bin(0.0), Some(0));
        assert_eq!(axis.find_bin(0.5), Some(1));
        assert_eq!(axis.find_bin(1.99), Some(3));
        // Right edge of the last bin is inclusive.
        assert_eq!(axis.find_bin(2.0), Some(3));
        assert_eq!(axis.find_bin(2.1), None);
    }
}
