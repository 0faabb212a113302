//! # sp-viz
//!
//! Visualization data artifacts for stackplot.
//!
//! This crate is intentionally dependency-light and focuses on emitting
//! plot-friendly JSON structures (arrays instead of nested objects). It
//! does no rendering: a frontend draws the stack, band, overlays and
//! labels from the numbers emitted here.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Stacked signal/background/data artifact.
pub mod stack;

pub use stack::{
    stack_artifact, BandEnvelope, DataSeries, LegendEntry, LegendStyle, PlotLabel, StackArtifact,
    StackOptions, StackSeries, StackTotal, YAxisPolicy,
};
