//! Engine configuration and per-call layout options

use crate::models::PrintData;
use serde::{Deserialize, Serialize};

/// Tunable constants of the validation and layout passes
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Ratio by which approximate widths are expected to compress during
    /// justification. The line budget is the bounds width divided by this.
    pub squishiness: f64,

    /// Space reserved at the start of each line for clef/key/time
    pub attributes_width_start: f64,

    /// Space reserved at the end of each line
    pub attributes_width_end: f64,

    /// Weight multiplier for expandable elements in underfilled measures
    pub underfilled_weight: f64,

    /// Validation passes allowed per measure before giving up
    pub max_measure_tries: usize,

    /// Vertical distance between staves of a system
    pub staff_distance: f64,

    /// Used when the print has no system distance
    pub default_system_distance: f64,

    /// Space added after the last element of a measure that is not last on its line
    pub measure_end_padding: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            squishiness: 0.8,
            attributes_width_start: 150.0,
            attributes_width_end: 50.0,
            underfilled_weight: 0.1,
            max_measure_tries: 100,
            staff_distance: 100.0,
            default_system_distance: 121.0,
            measure_end_padding: 15.0,
        }
    }
}

/// Flags for a single layout call
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    /// Page layout to use. Falls back to the first Print in the document.
    pub print: Option<PrintData>,

    /// 1-based page number used to pick page margins
    pub page: usize,

    /// Draft run: nothing is committed to the cache and versions stay put
    pub preview: bool,

    /// Lay every measure out on one unjustified line
    pub single_line_mode: bool,

    /// Force every measure to this width
    pub fixed_measure_width: Option<f64>,
}

impl LayoutOptions {
    pub fn page(&self) -> usize {
        self.page.max(1)
    }
}
