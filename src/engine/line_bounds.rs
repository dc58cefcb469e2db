//! Horizontal extent of a line and the top of the first system on a page

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{PrintData, SystemLayout};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineBounds {
    pub left: f64,
    pub right: f64,
    /// Y of the first system's top staff line (Y grows upward)
    pub top: f64,
    pub system_layout: SystemLayout,
}

impl LineBounds {
    /// Bounds for lines on 1-based `page` under `print`
    pub fn calculate(print: &PrintData, page: usize) -> Result<Self> {
        let page_layout = print.page_layout();
        let system_layout = print.system_layout();
        let margins = print
            .page_margins_for(page)
            .ok_or(EngineError::InvalidPageMargins(page))?;
        let system_margins = &system_layout.system_margins;

        let left = system_margins.left + margins.left;
        let right = page_layout.page_width - margins.right - system_margins.right;
        let top = page_layout.page_height
            - margins.top
            - system_layout.top_system_distance.unwrap_or(0.0);

        Ok(Self {
            left,
            right,
            top,
            system_layout: system_layout.clone(),
        })
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Vertical gap after each system
    pub fn system_distance(&self, config: &EngineConfig) -> f64 {
        self.system_layout
            .system_distance
            .unwrap_or(config.default_system_distance)
    }
}
