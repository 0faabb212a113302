//! Weighted 1-D histograms with under/overflow tracking.

use serde::{Deserialize, Serialize};

use sp_core::{Error, Result};

use crate::axis::Axis;

/// A weighted 1-D histogram over a uniform [`Axis`].
///
/// Stores the per-bin sum of weights and sum of squared weights (so the
/// statistical error of bin `i` is `sqrt(sumw2[i])`), plus separate
/// under/overflow accumulators and a raw entry count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram1d {
    /// Histogram name (used for bookkeeping and error messages).
    pub name: String,
    /// Binning shared by every histogram combined with this one.
    pub axis: Axis,
    /// Per-bin sum of weights.
    pub sumw: Vec<f64>,
    /// Per-bin sum of squared weights.
    pub sumw2: Vec<f64>,
    /// Sum of weights below `x_min` and its sum of squared weights.
    pub underflow: (f64, f64),
    /// Sum of weights above `x_max` and its sum of squared weights.
    pub overflow: (f64, f64),
    /// Number of fill calls (unweighted).
    pub entries: u64,
}

/// Numbers-first summary of a single histogram (under/overflow, totals,
/// per-bin contents with absolute and relative errors).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramSummary {
    /// Histogram name.
    pub name: String,
    /// Underflow content and its error.
    pub underflow: f64,
    /// Error on the underflow content.
    pub underflow_error: f64,
    /// Overflow content and its error.
    pub overflow: f64,
    /// Error on the overflow content.
    pub overflow_error: f64,
    /// Number of fill calls.
    pub entries: u64,
    /// Weighted total over all bins including under/overflow.
    pub total_weighted: f64,
    /// Weighted total over regular bins only.
    pub total_in_range: f64,
    /// Per-bin content.
    pub content: Vec<f64>,
    /// Per-bin absolute error.
    pub error: Vec<f64>,
    /// Per-bin relative error in percent (0 where the content is not positive).
    pub relative_error_pct: Vec<f64>,
}

impl Histogram1d {
    /// Book an empty histogram over `axis`.
    pub fn new(name: impl Into<String>, axis: Axis) -> Self {
        let n = axis.n_bins;
        Self {
            name: name.into(),
            axis,
            sumw: vec![0.0; n],
            sumw2: vec![0.0; n],
            underflow: (0.0, 0.0),
            overflow: (0.0, 0.0),
            entries: 0,
        }
    }

    /// Build a histogram from per-bin contents and errors (e.g. an imported
    /// distribution). `errors` must be non-negative and match `contents`.
    pub fn from_bins(
        name: impl Into<String>,
        axis: Axis,
        contents: Vec<f64>,
        errors: Vec<f64>,
    ) -> Result<Self> {
        let name = name.into();
        if contents.len() != axis.n_bins || errors.len() != axis.n_bins {
            return Err(Error::ShapeMismatch(format!(
                "histogram '{}': expected {} bins, got {} contents / {} errors",
                name,
                axis.n_bins,
                contents.len(),
                errors.len()
            )));
        }
        if errors.iter().any(|e| !e.is_finite() || *e < 0.0) {
            return Err(Error::Validation(format!(
                "histogram '{}': bin errors must be finite and non-negative",
                name
            )));
        }
        let sumw2 = errors.iter().map(|e| e * e).collect();
        Ok(Self {
            name,
            axis,
            sumw: contents,
            sumw2,
            underflow: (0.0, 0.0),
            overflow: (0.0, 0.0),
            entries: 0,
        })
    }

    /// Fill with value `x` and weight `w`.
    pub fn fill(&mut self, x: f64, w: f64) {
        self.entries += 1;
        match self.axis.find_bin(x) {
            Some(i) => {
                self.sumw[i] += w;
                self.sumw2[i] += w * w;
            }
            None if x < self.axis.x_min => {
                self.underflow.0 += w;
                self.underflow.1 += w * w;
            }
            None => {
                self.overflow.0 += w;
                self.overflow.1 += w * w;
            }
        }
    }

    /// Scale every bin (including under/overflow) by `k`. Errors scale by
    /// `|k|` since the sum of squared weights scales by `k^2`.
    pub fn scale(&mut self, k: f64) {
        for w in &mut self.sumw {
            *w *= k;
        }
        for w2 in &mut self.sumw2 {
            *w2 *= k * k;
        }
        self.underflow.0 *= k;
        self.underflow.1 *= k * k;
        self.overflow.0 *= k;
        self.overflow.1 *= k * k;
    }

    /// Content of bin `i` (0-based).
    pub fn content(&self, i: usize) -> f64 {
        self.sumw[i]
    }

    /// Statistical error of bin `i` (0-based).
    pub fn error(&self, i: usize) -> f64 {
        self.sumw2[i].max(0.0).sqrt()
    }

    /// Per-bin statistical errors.
    pub fn errors(&self) -> Vec<f64> {
        (0..self.axis.n_bins).map(|i| self.error(i)).collect()
    }

    /// Sum of regular-bin contents.
    pub fn integral(&self) -> f64 {
        self.sumw.iter().sum()
    }

    /// Sum of all contents including under/overflow.
    pub fn integral_with_flow(&self) -> f64 {
        self.integral() + self.underflow.0 + self.overflow.0
    }

    /// Highest bin content (0 for an empty histogram).
    pub fn maximum(&self) -> f64 {
        self.sumw.iter().copied().fold(0.0_f64, f64::max)
    }

    /// Summarize contents, errors, totals and under/overflow.
    pub fn summary(&self) -> HistogramSummary {
        let content = self.sumw.clone();
        let error = self.errors();
        let relative_error_pct = content
            .iter()
            .zip(error.iter())
            .map(|(&c, &e)| if c > 0.0 { e / c * 100.0 } else { 0.0 })
            .collect();
        HistogramSummary {
            name: self.name.clone(),
            underflow: self.underflow.0,
            underflow_error: self.underflow.1.max(0.0).sqrt(),
            overflow: self.overflow.0,
            overflow_error: self.overflow.1.max(0.0).sqrt(),
            entries: self.entries,
            total_weighted: self.integral_with_flow(),
            total_in_range: self.integral(),
            content,
            error,
            relative_error_pct,
        }
    }
}
