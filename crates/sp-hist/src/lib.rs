//! # sp-hist
//!
//! 1-D histogram data model (uniform binning, weighted fills, under/overflow)
//! and the background-total uncertainty aggregation used by stacked plots.
//!
//! This crate is intentionally dependency-light: histograms are plain
//! serde-friendly structs with parallel arrays, and the aggregation is a
//! pure function of immutable snapshots.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod axis;
pub mod histogram;
pub mod process;
pub mod uncertainty;

pub use axis::Axis;
pub use histogram::{Histogram1d, HistogramSummary};
pub use process::{ProcessContribution, ProcessRole};
pub use uncertainty::{
    aggregate, AggregateOptions, AggregateResult, ErrorBand, FractionalSystematic, ShapeVariation,
};
