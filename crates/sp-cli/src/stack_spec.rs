//! Processes spec v0 (JSON) parsing + semantic validation.
//!
//! A single JSON file drives the CLI: binning, per-process distributions
//! with roles and legends, optional systematic descriptors, and plot
//! presentation options.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use sp_hist::uncertainty::{AggregateOptions, FractionalSystematic, ShapeVariation};
use sp_hist::{Axis, Histogram1d, ProcessContribution, ProcessRole};
use sp_viz::StackOptions;

const SPEC_V0: &str = "stackplot_processes_v0";

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessesSpecV0 {
    pub schema_version: String,
    pub binning: BinningSpec,
    #[serde(default)]
    pub plot: StackOptions,
    pub processes: Vec<ProcessSpec>,
    #[serde(default)]
    pub systematics: SystematicsSpec,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BinningSpec {
    pub n_bins: usize,
    pub x_min: f64,
    pub x_max: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessSpec {
    pub name: String,
    pub role: ProcessRole,
    pub y: Vec<f64>,
    /// Per-bin errors; defaults to `sqrt(max(y, 0))` when omitted.
    #[serde(default)]
    pub yerr: Option<Vec<f64>>,
    #[serde(default)]
    pub legend: Option<String>,
    /// Multiplicative scale applied to the distribution (cross-section or
    /// luminosity weight).
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystematicsSpec {
    /// Per-process fractional uncertainties, one fraction per bin.
    #[serde(default)]
    pub fractional: HashMap<String, Vec<f64>>,
    /// Per-process up/down shape variations.
    #[serde(default)]
    pub shape: HashMap<String, ShapeSpec>,
    /// Fully-correlated luminosity fraction.
    #[serde(default)]
    pub lumi_frac: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShapeSpec {
    pub up: Vec<f64>,
    pub down: Vec<f64>,
}

/// Everything a CLI command needs, resolved from a spec file.
#[derive(Debug, Clone)]
pub struct ResolvedSpec {
    pub processes: Vec<ProcessContribution>,
    pub plot: StackOptions,
    pub aggregate: AggregateOptions,
}

pub fn read_processes_spec(path: &Path) -> Result<ResolvedSpec> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read spec file: {}", path.display()))?;
    let spec: ProcessesSpecV0 =
        serde_json::from_slice(&bytes).context("failed to parse processes spec")?;

    if spec.schema_version != SPEC_V0 {
        bail!(
            "unsupported schema_version '{}', expected '{}'",
            spec.schema_version,
            SPEC_V0
        );
    }
    resolve(spec)
}

fn resolve(spec: ProcessesSpecV0) -> Result<ResolvedSpec> {
    let axis = Axis::new(spec.binning.n_bins, spec.binning.x_min, spec.binning.x_max)?;

    let mut processes = Vec::with_capacity(spec.processes.len());
    for p in spec.processes {
        let yerr = match p.yerr {
            Some(e) => e,
            None => p.y.iter().map(|v| v.max(0.0).sqrt()).collect(),
        };
        let mut hist = Histogram1d::from_bins(&p.name, axis, p.y, yerr)?;
        if p.weight != 1.0 {
            hist.scale(p.weight);
        }
        let mut contribution = ProcessContribution::new(p.name, p.role, hist);
        contribution.legend = p.legend;
        processes.push(contribution);
    }

    let mut aggregate = AggregateOptions {
        lumi_frac: spec.systematics.lumi_frac,
        ..Default::default()
    };
    for (name, fractions) in spec.systematics.fractional {
        aggregate.fractional.insert(name, FractionalSystematic { fractions });
    }
    for (name, shape) in spec.systematics.shape {
        let n = shape.up.len();
        let up = Histogram1d::from_bins(format!("{}_up", name), axis, shape.up, vec![0.0; n])?;
        let n = shape.down.len();
        let down =
            Histogram1d::from_bins(format!("{}_down", name), axis, shape.down, vec![0.0; n])?;
        aggregate.shape.insert(name, ShapeVariation { up, down });
    }

    Ok(ResolvedSpec { processes, plot: spec.plot, aggregate })
}
