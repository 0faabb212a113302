//! Process roles for stacked plots.

use serde::{Deserialize, Serialize};

use crate::histogram::Histogram1d;

/// How a process is treated in a stacked plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessRole {
    /// Drawn as an overlaid line on top of the stack.
    Signal,
    /// Stacked and included in the background total.
    Background,
    /// Drawn as points with Poisson intervals.
    Data,
}

/// One per-process histogram tagged with its role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessContribution {
    /// Process name (keys systematic descriptors).
    pub name: String,
    /// Stack role.
    pub role: ProcessRole,
    /// The nominal distribution.
    pub hist: Histogram1d,
    /// Legend label, if the process should appear in the legend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<String>,
}

impl ProcessContribution {
    /// Tag `hist` with a role.
    pub fn new(name: impl Into<String>, role: ProcessRole, hist: Histogram1d) -> Self {
        Self { name: name.into(), role, hist, legend: None }
    }

    /// Attach a legend label.
    pub fn with_legend(mut self, legend: impl Into<String>) -> Self {
        self.legend = Some(legend.into());
        self
    }
}
