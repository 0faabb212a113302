//! Stacked-distribution artifact (numbers-first).
//!
//! Replaces a canvas/stack/legend object pipeline with one JSON artifact:
//! background series in stack order, the background total with its combined
//! uncertainty band, signal overlays, data points with Poisson intervals,
//! legend entries and y-axis policy.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use sp_core::{Error, Result};
use sp_hist::uncertainty::{aggregate, AggregateOptions, ErrorBand};
use sp_hist::{Axis, ProcessContribution, ProcessRole};

const SCHEMA_VERSION: &str = "stackplot_stack_v0";

/// Presentation options for [`stack_artifact`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackOptions {
    /// X-axis quantity name (without units).
    #[serde(default)]
    pub x_title: String,
    /// Units appended to the axis titles, empty for dimensionless.
    #[serde(default)]
    pub units: String,
    /// Y-axis quantity name, typically "Events".
    #[serde(default = "default_y_title")]
    pub y_title: String,
    /// Logarithmic y axis.
    #[serde(default)]
    pub log_y: bool,
    /// Stack backgrounds by ascending integral instead of input order.
    #[serde(default = "default_true")]
    pub stack_in_order: bool,
    /// Free-floating text labels in normalized canvas coordinates.
    #[serde(default)]
    pub labels: Vec<PlotLabel>,
}

fn default_y_title() -> String {
    "Events".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            x_title: String::new(),
            units: String::new(),
            y_title: default_y_title(),
            log_y: false,
            stack_in_order: true,
            labels: Vec::new(),
        }
    }
}

/// Text label in normalized canvas coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotLabel {
    /// Horizontal position in `[0, 1]`.
    pub x: f64,
    /// Vertical position in `[0, 1]`.
    pub y: f64,
    /// Label text.
    pub text: String,
    /// Text size relative to the canvas height.
    #[serde(default = "default_text_size")]
    pub text_size: f64,
}

fn default_text_size() -> f64 {
    0.045
}

/// Metadata block attached to every artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackMeta {
    /// Producing tool name.
    pub tool: String,
    /// Producing tool version.
    pub tool_version: String,
    /// Creation time (unix milliseconds).
    pub created_unix_ms: u128,
}

/// Band drawn as lower/upper envelope curves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandEnvelope {
    /// Lower envelope per bin (clamped at zero for display).
    pub lo: Vec<f64>,
    /// Upper envelope per bin.
    pub hi: Vec<f64>,
}

/// One stacked or overlaid series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSeries {
    /// Process name.
    pub name: String,
    /// Legend label, absent if the series is not legended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<String>,
    /// Per-bin contents.
    pub y: Vec<f64>,
    /// Per-bin statistical errors.
    pub yerr: Vec<f64>,
    /// Sum over regular bins (used for stack and legend ordering).
    pub integral: f64,
}

/// Background total with its combined uncertainty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackTotal {
    /// Nominal summed contents per bin.
    pub y: Vec<f64>,
    /// Combined uncertainty per bin.
    pub yerr: Vec<f64>,
    /// Band as (center, half-width, value, uncertainty) parallel arrays.
    pub band: ErrorBand,
    /// Band as lo/hi envelope curves.
    pub envelope: BandEnvelope,
}

/// Data series with asymmetric Poisson intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSeries {
    /// Process name.
    pub name: String,
    /// Legend label, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<String>,
    /// Per-bin observed contents.
    pub y: Vec<f64>,
    /// Downward interval half-widths.
    pub yerr_lo: Vec<f64>,
    /// Upward interval half-widths.
    pub yerr_hi: Vec<f64>,
    /// How the intervals were computed.
    pub error_model: String,
}

/// Draw style of a legend entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendStyle {
    /// Filled box (stacked backgrounds).
    Fill,
    /// Line (signal and data overlays).
    Line,
    /// Hatched band (background total).
    Band,
}

/// One legend entry, in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegendEntry {
    /// Displayed label.
    pub label: String,
    /// Name of the series the entry points at.
    pub series: String,
    /// Draw style.
    pub style: LegendStyle,
}

/// Y-axis range policy derived from the peak among all series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YAxisPolicy {
    /// Logarithmic axis.
    pub log: bool,
    /// Highest point among the stacked total and all overlays.
    pub y_peak: f64,
    /// Suggested axis minimum.
    pub y_min: f64,
    /// Suggested axis maximum (peak with headroom for legends/labels).
    pub y_max: f64,
}

/// Plot-friendly artifact for one stacked signal/background/data figure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackArtifact {
    /// Artifact schema identifier.
    pub schema_version: String,
    /// Producer metadata.
    pub meta: StackMeta,
    /// Full x-axis title, units included.
    pub x_title: String,
    /// Full y-axis title ("Events / width units").
    pub y_title: String,
    /// Shared bin edges (`n_bins + 1` values).
    pub bin_edges: Vec<f64>,
    /// Backgrounds in draw order (bottom of the stack first).
    pub backgrounds: Vec<StackSeries>,
    /// Names of `backgrounds` in draw order.
    pub stack_order: Vec<String>,
    /// Background total and band; absent when there are no backgrounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<StackTotal>,
    /// Signal overlays in input order.
    pub signals: Vec<StackSeries>,
    /// Data series, if supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DataSeries>,
    /// Legend entries in display order.
    pub legend: Vec<LegendEntry>,
    /// Y-axis policy.
    pub y_axis: YAxisPolicy,
    /// Text labels.
    pub labels: Vec<PlotLabel>,
}

fn now_unix_ms() -> Result<u128> {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Computation(format!("system time error: {}", e)))?;
    Ok(d.as_millis())
}

fn is_near_integer_nonneg(x: f64) -> Option<u64> {
    if !(x.is_finite() && x >= 0.0) {
        return None;
    }
    let r = x.round();
    if (x - r).abs() <= 1e-9 { Some(r as u64) } else { None }
}

/// Central 68.27% Poisson interval (Garwood) for an observed count.
fn garwood_68_interval(n: u64) -> (f64, f64) {
    let alpha = 0.31731_f64;
    let lo = if n == 0 {
        0.0
    } else {
        let dist = ChiSquared::new(2.0 * (n as f64)).unwrap();
        (n as f64) - 0.5 * dist.inverse_cdf(alpha / 2.0)
    };
    let dist_hi = ChiSquared::new(2.0 * ((n + 1) as f64)).unwrap();
    let hi = 0.5 * dist_hi.inverse_cdf(1.0 - alpha / 2.0) - (n as f64);
    (lo, hi)
}

fn data_intervals(y: &[f64]) -> (Vec<f64>, Vec<f64>, String) {
    let mut lo = Vec::with_capacity(y.len());
    let mut hi = Vec::with_capacity(y.len());
    let mut all_poisson = true;
    for &v in y {
        if let Some(n) = is_near_integer_nonneg(v) {
            let (dl, dh) = garwood_68_interval(n);
            lo.push(dl);
            hi.push(dh);
        } else {
            all_poisson = false;
            let e = if v.is_finite() && v > 0.0 { v.sqrt() } else { f64::NAN };
            lo.push(e);
            hi.push(e);
        }
    }
    let model = if all_poisson { "garwood_poisson_68" } else { "sqrt_y_fallback" };
    (lo, hi, model.to_string())
}

fn envelope_from_total(total: &[f64], sigma: &[f64]) -> BandEnvelope {
    let mut lo = Vec::with_capacity(total.len());
    let mut hi = Vec::with_capacity(total.len());
    for (y, s) in total.iter().zip(sigma.iter()) {
        lo.push((y - s).max(0.0));
        hi.push(y + s);
    }
    BandEnvelope { lo, hi }
}

fn series_from(p: &ProcessContribution) -> StackSeries {
    StackSeries {
        name: p.name.clone(),
        legend: p.legend.clone(),
        y: p.hist.sumw.clone(),
        yerr: p.hist.errors(),
        integral: p.hist.integral(),
    }
}

fn shared_axis(processes: &[ProcessContribution]) -> Result<Axis> {
    let first = processes
        .first()
        .ok_or_else(|| Error::EmptyInput("no process contributions supplied".to_string()))?;
    let axis = first.hist.axis;
    for p in processes {
        if p.hist.axis != axis {
            return Err(Error::ShapeMismatch(format!(
                "process '{}' is binned differently from '{}'",
                p.name, first.name
            )));
        }
    }
    Ok(axis)
}

fn axis_titles(axis: Axis, opts: &StackOptions) -> (String, String) {
    // Bin width rounded to one decimal for the y-axis caption.
    let width = (axis.bin_width() * 10.0).round() / 10.0;
    let x_title = if opts.units.is_empty() {
        opts.x_title.clone()
    } else {
        format!("{} [{}]", opts.x_title, opts.units)
    };
    let y_title = if opts.units.is_empty() {
        format!("{} / {}", opts.y_title, width)
    } else {
        format!("{} / {} {}", opts.y_title, width, opts.units)
    };
    (x_title, y_title)
}

/// Build a stacked signal/background/data artifact.
///
/// Backgrounds are summed through [`aggregate`], so the band carries the
/// full combined uncertainty configured in `agg`. At least one process is
/// required; all processes must share one binning.
pub fn stack_artifact(
    processes: &[ProcessContribution],
    opts: &StackOptions,
    agg: &AggregateOptions,
) -> Result<StackArtifact> {
    let axis = shared_axis(processes)?;

    let backgrounds: Vec<&ProcessContribution> =
        processes.iter().filter(|p| p.role == ProcessRole::Background).collect();
    let signals: Vec<&ProcessContribution> =
        processes.iter().filter(|p| p.role == ProcessRole::Signal).collect();
    let data_procs: Vec<&ProcessContribution> =
        processes.iter().filter(|p| p.role == ProcessRole::Data).collect();
    if data_procs.len() > 1 {
        return Err(Error::Validation(format!(
            "at most one data process is supported, got {}",
            data_procs.len()
        )));
    }

    let mut bkg_series: Vec<StackSeries> = backgrounds.iter().map(|p| series_from(p)).collect();
    if opts.stack_in_order {
        // Smallest process sits at the bottom of the stack.
        bkg_series.sort_by(|a, b| {
            a.integral.partial_cmp(&b.integral).unwrap_or(std::cmp::Ordering::Equal)
        });
    }
    let stack_order: Vec<String> = bkg_series.iter().map(|s| s.name.clone()).collect();

    let total = if backgrounds.is_empty() {
        None
    } else {
        let owned: Vec<ProcessContribution> =
            backgrounds.iter().map(|p| (*p).clone()).collect();
        let r = aggregate(&owned, agg)?;
        let yerr = r.total.errors();
        let envelope = envelope_from_total(&r.total.sumw, &yerr);
        Some(StackTotal { y: r.total.sumw, yerr, band: r.band, envelope })
    };

    let signal_series: Vec<StackSeries> = signals.iter().map(|p| series_from(p)).collect();

    let data = match data_procs.first() {
        Some(p) => {
            let (yerr_lo, yerr_hi, error_model) = data_intervals(&p.hist.sumw);
            Some(DataSeries {
                name: p.name.clone(),
                legend: p.legend.clone(),
                y: p.hist.sumw.clone(),
                yerr_lo,
                yerr_hi,
                error_model,
            })
        }
        None => None,
    };

    // Legend: backgrounds by descending integral, then the total band,
    // then signal and data overlays in input order.
    let mut legend: Vec<LegendEntry> = Vec::new();
    let mut legended_bkgs: Vec<&StackSeries> =
        bkg_series.iter().filter(|s| s.legend.is_some()).collect();
    legended_bkgs.sort_by(|a, b| {
        b.integral.partial_cmp(&a.integral).unwrap_or(std::cmp::Ordering::Equal)
    });
    for s in legended_bkgs {
        legend.push(LegendEntry {
            label: s.legend.clone().unwrap_or_default(),
            series: s.name.clone(),
            style: LegendStyle::Fill,
        });
    }
    if total.is_some() {
        legend.push(LegendEntry {
            label: "Total SM".to_string(),
            series: "bkg_total".to_string(),
            style: LegendStyle::Band,
        });
    }
    for s in signal_series.iter().filter(|s| s.legend.is_some()) {
        legend.push(LegendEntry {
            label: s.legend.clone().unwrap_or_default(),
            series: s.name.clone(),
            style: LegendStyle::Line,
        });
    }
    if let Some(d) = &data {
        if let Some(label) = &d.legend {
            legend.push(LegendEntry {
                label: label.clone(),
                series: d.name.clone(),
                style: LegendStyle::Line,
            });
        }
    }

    let mut y_peak = total
        .as_ref()
        .map(|t| t.y.iter().copied().fold(0.0_f64, f64::max))
        .unwrap_or(0.0);
    for p in signals.iter().chain(data_procs.iter()) {
        y_peak = y_peak.max(p.hist.maximum());
    }
    let (y_min, y_max) = if opts.log_y {
        (0.5, y_peak * 1e5)
    } else {
        (0.0, y_peak * 3.0)
    };

    let (x_title, y_title) = axis_titles(axis, opts);

    tracing::info!(
        backgrounds = bkg_series.len(),
        signals = signal_series.len(),
        has_data = data.is_some(),
        y_peak,
        "built stack artifact"
    );

    Ok(StackArtifact {
        schema_version: SCHEMA_VERSION.to_string(),
        meta: StackMeta {
            tool: "stackplot".to_string(),
            tool_version: sp_core::VERSION.to_string(),
            created_unix_ms: now_unix_ms()?,
        },
        x_title,
        y_title,
        bin_edges: axis.edges(),
        backgrounds: bkg_series,
        stack_order,
        total,
        signals: signal_series,
        data,
        legend,
        y_axis: YAxisPolicy { log: opts.log_y, y_peak, y_min, y_max },
        labels: opts.labels.clone(),
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_garwood_zero_count() {
        let (lo, hi) = garwood_68_interval(0);
        assert_eq!(lo, 0.0);
        assert!(hi > 1.0 && hi < 2.0);
    }

    #[test]
    fn test_garwood_large_count_near_sqrt() {
        let (lo, hi) = garwood_68_interval(10_000);
        assert_abs_diff_eq!(lo, 100.0, epsilon = 1.0);
        assert_abs_diff_eq!(hi, 100.0, epsilon = 1.0);
    }

    #[test]
    fn test_data_intervals_fallback() {
        let (lo, hi, model) = data_intervals(&[4.0, 2.5]);
        assert_eq!(model, "sqrt_y_fallback");
        assert_abs_diff_eq!(lo[1], 2.5_f64.sqrt(), epsilon = 1e-12);
        assert_eq!(lo[1], hi[1]);
    }

    #[test]
    fn test_envelope_clamps_at_zero() {
        let env = envelope_from_total(&[1.0, 0.5], &[2.0, 0.1]);
        assert_eq!(env.lo[0], 0.0);
        assert_abs_diff_eq!(env.lo[1], 0.4, epsilon = 1e-12);
        assert_eq!(env.hi[0], 3.0);
        assert_abs_diff_eq!(env.hi[1], 0.6, epsilon = 1e-12);
    }
}
