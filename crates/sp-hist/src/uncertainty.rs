//! Background-total uncertainty aggregation.
//!
//! Combines, per bin and in quadrature: statistical variance of the summed
//! processes, uncorrelated per-process fractional systematics, a symmetrized
//! shape-variation envelope, and a fully-correlated luminosity term applied
//! once at the total level. Pure function of immutable snapshots; every
//! input is validated before any bin is computed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use sp_core::{Error, Result};

use crate::axis::Axis;
use crate::histogram::Histogram1d;
use crate::process::ProcessContribution;

/// Uncorrelated relative uncertainty on one process's yield, one fraction
/// per bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractionalSystematic {
    /// Non-negative fraction per bin.
    pub fractions: Vec<f64>,
}

/// Up/down varied distributions for one process, same binning as the nominal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeVariation {
    /// Upward-varied distribution.
    pub up: Histogram1d,
    /// Downward-varied distribution.
    pub down: Histogram1d,
}

/// Optional uncertainty sources for [`aggregate`], keyed by process name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateOptions {
    /// Per-process fractional systematics.
    #[serde(default)]
    pub fractional: HashMap<String, FractionalSystematic>,
    /// Per-process shape variations.
    #[serde(default)]
    pub shape: HashMap<String, ShapeVariation>,
    /// Fully-correlated normalization uncertainty on the total, as a
    /// fraction (e.g. `0.017` for 1.7% luminosity).
    #[serde(default)]
    pub lumi_frac: f64,
}

/// Shaded-band representation of the total: parallel arrays of bin center,
/// half bin width, nominal value and symmetric total uncertainty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBand {
    /// Bin centers.
    pub x: Vec<f64>,
    /// Half bin widths (horizontal extent of the band).
    pub x_err: Vec<f64>,
    /// Nominal total per bin.
    pub y: Vec<f64>,
    /// Symmetric total uncertainty per bin.
    pub y_err: Vec<f64>,
}

impl ErrorBand {
    /// Number of bins.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the band is empty.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Result of one aggregation: the nominal sum with the combined uncertainty
/// injected as its per-bin error, plus the band derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Nominal sum histogram; its per-bin error is the total uncertainty.
    pub total: Histogram1d,
    /// Band representation of the same numbers.
    pub band: ErrorBand,
}

fn validate(processes: &[ProcessContribution], opts: &AggregateOptions) -> Result<Axis> {
    let first = processes
        .first()
        .ok_or_else(|| Error::EmptyInput("no process contributions supplied".to_string()))?;
    let axis = first.hist.axis;

    for p in processes {
        if p.hist.axis != axis {
            return Err(Error::ShapeMismatch(format!(
                "process '{}' has {} bins over [{}, {}], expected {} bins over [{}, {}]",
                p.name,
                p.hist.axis.n_bins,
                p.hist.axis.x_min,
                p.hist.axis.x_max,
                axis.n_bins,
                axis.x_min,
                axis.x_max
            )));
        }
    }

    for (name, sys) in &opts.fractional {
        if !processes.iter().any(|p| &p.name == name) {
            return Err(Error::InvalidSystematic(format!(
                "fractional systematic refers to unknown process '{}'",
                name
            )));
        }
        if sys.fractions.len() != axis.n_bins {
            return Err(Error::InvalidSystematic(format!(
                "fractional systematic for '{}' has {} entries, expected {}",
                name,
                sys.fractions.len(),
                axis.n_bins
            )));
        }
        if sys.fractions.iter().any(|f| !f.is_finite() || *f < 0.0) {
            return Err(Error::InvalidSystematic(format!(
                "fractional systematic for '{}' must be finite and non-negative",
                name
            )));
        }
    }

    for (name, var) in &opts.shape {
        if !processes.iter().any(|p| &p.name == name) {
            return Err(Error::InvalidSystematic(format!(
                "shape variation refers to unknown process '{}'",
                name
            )));
        }
        if var.up.axis != axis || var.down.axis != axis {
            return Err(Error::ShapeMismatch(format!(
                "shape variation for '{}' is binned differently from the nominal",
                name
            )));
        }
    }

    if !opts.lumi_frac.is_finite() || opts.lumi_frac < 0.0 {
        return Err(Error::InvalidSystematic(format!(
            "luminosity fraction must be finite and non-negative, got {}",
            opts.lumi_frac
        )));
    }

    Ok(axis)
}

/// Sum `processes` bin-wise and combine all uncertainty sources into a
/// single symmetric per-bin uncertainty.
///
/// Per bin: statistical variances add across processes; each supplied
/// fractional systematic contributes `(f * content)^2`; each shape variation
/// contributes the squared envelope `max(|up - nom|, |nom - down|)^2`; a
/// positive `lumi_frac` contributes `(lumi_frac * total)^2` exactly once,
/// computed from the combined nominal since it is fully correlated across
/// processes. The total error is the square root of the accumulated
/// variance, so it is never below the statistical-only error.
pub fn aggregate(
    processes: &[ProcessContribution],
    opts: &AggregateOptions,
) -> Result<AggregateResult> {
    let axis = validate(processes, opts)?;
    let n = axis.n_bins;

    let mut nominal = vec![0.0_f64; n];
    let mut var = vec![0.0_f64; n];
    let mut underflow = (0.0, 0.0);
    let mut overflow = (0.0, 0.0);
    let mut entries = 0u64;

    for p in processes {
        for i in 0..n {
            nominal[i] += p.hist.sumw[i];
            var[i] += p.hist.sumw2[i];
        }
        underflow.0 += p.hist.underflow.0;
        underflow.1 += p.hist.underflow.1;
        overflow.0 += p.hist.overflow.0;
        overflow.1 += p.hist.overflow.1;
        entries += p.hist.entries;
    }

    for p in processes {
        if let Some(sys) = opts.fractional.get(&p.name) {
            for i in 0..n {
                let d = sys.fractions[i] * p.hist.sumw[i];
                var[i] += d * d;
            }
        }
    }

    for p in processes {
        if let Some(shape) = opts.shape.get(&p.name) {
            for i in 0..n {
                let nom = p.hist.sumw[i];
                let d_up = shape.up.sumw[i] - nom;
                let d_down = nom - shape.down.sumw[i];
                // Envelope: the larger one-sided shift becomes the symmetric
                // half-width. The asymmetry is deliberately discarded.
                let delta = d_up.abs().max(d_down.abs());
                var[i] += delta * delta;
            }
        }
    }

    if opts.lumi_frac > 0.0 {
        for i in 0..n {
            let d = opts.lumi_frac * nominal[i];
            var[i] += d * d;
        }
    }

    let total_err: Vec<f64> = var.iter().map(|v| v.max(0.0).sqrt()).collect();

    tracing::debug!(
        bins = n,
        processes = processes.len(),
        lumi_frac = opts.lumi_frac,
        "aggregated background total"
    );

    let band = ErrorBand {
        x: (0..n).map(|i| axis.center(i)).collect(),
        x_err: vec![axis.bin_width() / 2.0; n],
        y: nominal.clone(),
        y_err: total_err.clone(),
    };

    let total = Histogram1d {
        name: "bkg_total".to_string(),
        axis,
        sumw: nominal,
        sumw2: total_err.iter().map(|e| e * e).collect(),
        underflow,
        overflow,
        entries,
    };

    Ok(AggregateResult { total, band })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::process::ProcessRole;

    fn bkg(name: &str, axis: Axis, y: Vec<f64>, yerr: Vec<f64>) -> ProcessContribution {
        ProcessContribution::new(
            name,
            ProcessRole::Background,
            Histogram1d::from_bins(name, axis, y, yerr).unwrap(),
        )
    }

    #[test]
    fn test_stat_only_quadrature() {
        let axis = Axis::new(2, 0.0, 2.0).unwrap();
        let procs = vec![
            bkg("a", axis, vec![10.0, 20.0], vec![1.0, 2.0]),
            bkg("b", axis, vec![5.0, 5.0], vec![1.0, 1.0]),
        ];
        let r = aggregate(&procs, &AggregateOptions::default()).unwrap();
        assert_eq!(r.total.sumw, vec![15.0, 25.0]);
        assert_abs_diff_eq!(r.total.error(0), 2.0_f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(r.total.error(1), 5.0_f64.sqrt(), epsilon = 1e-12);
        assert_eq!(r.band.y, r.total.sumw);
        assert_eq!(r.band.x, vec![0.5, 1.5]);
        assert_eq!(r.band.x_err, vec![0.5, 0.5]);
    }

    #[test]
    fn test_lumi_applied_once_at_total_level() {
        let axis = Axis::new(1, 0.0, 1.0).unwrap();
        let procs = vec![
            bkg("a", axis, vec![60.0], vec![0.0]),
            bkg("b", axis, vec![40.0], vec![0.0]),
        ];
        let opts = AggregateOptions { lumi_frac: 0.05, ..Default::default() };
        let r = aggregate(&procs, &opts).unwrap();
        // 5% of the combined 100, not per-process quadrature.
        assert_abs_diff_eq!(r.total.error(0), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_envelope() {
        let axis = Axis::new(1, 0.0, 1.0).unwrap();
        let procs = vec![bkg("a", axis, vec![50.0], vec![0.0])];
        let mut opts = AggregateOptions::default();
        opts.shape.insert(
            "a".to_string(),
            ShapeVariation {
                up: Histogram1d::from_bins("a_up", axis, vec![55.0], vec![0.0]).unwrap(),
                down: Histogram1d::from_bins("a_down", axis, vec![42.0], vec![0.0]).unwrap(),
            },
        );
        let r = aggregate(&procs, &opts).unwrap();
        // d_up = 5, d_down = 8, envelope = 8
        assert_abs_diff_eq!(r.total.error(0), 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            aggregate(&[], &AggregateOptions::default()),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let a10 = Axis::new(10, 0.0, 1.0).unwrap();
        let a12 = Axis::new(12, 0.0, 1.0).unwrap();
        let procs = vec![
            bkg("a", a10, vec![1.0; 10], vec![0.0; 10]),
            bkg("b", a12, vec![1.0; 12], vec![0.0; 12]),
        ];
        assert!(matches!(
            aggregate(&procs, &AggregateOptions::default()),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_invalid_systematic_rejected() {
        let axis = Axis::new(2, 0.0, 1.0).unwrap();
        let procs = vec![bkg("a", axis, vec![1.0, 1.0], vec![0.0, 0.0])];

        let mut opts = AggregateOptions::default();
        opts.fractional
            .insert("a".to_string(), FractionalSystematic { fractions: vec![-0.1, 0.1] });
        assert!(matches!(aggregate(&procs, &opts), Err(Error::InvalidSystematic(_))));

        let mut opts = AggregateOptions::default();
        opts.fractional.insert("a".to_string(), FractionalSystematic { fractions: vec![0.1] });
        assert!(matches!(aggregate(&procs, &opts), Err(Error::InvalidSystematic(_))));

        let mut opts = AggregateOptions::default();
        opts.fractional
            .insert("nosuch".to_string(), FractionalSystematic { fractions: vec![0.1, 0.1] });
        assert!(matches!(aggregate(&procs, &opts), Err(Error::InvalidSystematic(_))));

        let opts = AggregateOptions { lumi_frac: -0.01, ..Default::default() };
        assert!(matches!(aggregate(&procs, &opts), Err(Error::InvalidSystematic(_))));
    }
}
