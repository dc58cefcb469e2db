//! Page and system layout carried by Print elements

use super::types::OddEvenBoth;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMargins {
    #[serde(rename = "type", default)]
    pub kind: OddEvenBoth,
    pub left: f64,
    pub right: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub bottom: f64,
}

impl PageMargins {
    /// Whether these margins apply to a 1-based page number
    pub fn applies_to(&self, page: usize) -> bool {
        match self.kind {
            OddEvenBoth::Both => true,
            OddEvenBoth::Even => page % 2 == 0,
            OddEvenBoth::Odd => page % 2 == 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLayout {
    pub page_width: f64,
    pub page_height: f64,
    #[serde(default)]
    pub page_margins: Vec<PageMargins>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMargins {
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub right: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemLayout {
    #[serde(default)]
    pub system_margins: SystemMargins,
    #[serde(default)]
    pub system_distance: Option<f64>,
    #[serde(default)]
    pub top_system_distance: Option<f64>,
}

impl Default for PageLayout {
    /// Letter-sized page in tenths with uniform margins
    fn default() -> Self {
        Self {
            page_width: 1223.0,
            page_height: 1584.0,
            page_margins: vec![PageMargins {
                kind: OddEvenBoth::Both,
                left: 70.0,
                right: 70.0,
                top: 88.0,
                bottom: 88.0,
            }],
        }
    }
}

static DEFAULT_PAGE_LAYOUT: Lazy<PageLayout> = Lazy::new(PageLayout::default);
static DEFAULT_SYSTEM_LAYOUT: Lazy<SystemLayout> = Lazy::new(SystemLayout::default);

/// Print element payload.
///
/// Layout blocks left empty are inherited from the previous Print during
/// validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintData {
    #[serde(default)]
    pub page_layout: Option<PageLayout>,
    #[serde(default)]
    pub system_layout: Option<SystemLayout>,
    #[serde(default)]
    pub new_system: bool,
    #[serde(default)]
    pub new_page: bool,
}

impl PrintData {
    pub fn page_layout(&self) -> &PageLayout {
        self.page_layout.as_ref().unwrap_or(&DEFAULT_PAGE_LAYOUT)
    }

    pub fn system_layout(&self) -> &SystemLayout {
        self.system_layout.as_ref().unwrap_or(&DEFAULT_SYSTEM_LAYOUT)
    }

    /// Fill empty layout blocks from `previous`. Returns whether anything changed.
    pub fn inherit(&mut self, previous: &PrintData) -> bool {
        let mut changed = false;
        if self.page_layout.is_none() {
            self.page_layout = Some(previous.page_layout().clone());
            changed = true;
        }
        if self.system_layout.is_none() {
            self.system_layout = Some(previous.system_layout().clone());
            changed = true;
        }
        changed
    }

    /// First margin set that applies to `page` (1-based)
    pub fn page_margins_for(&self, page: usize) -> Option<&PageMargins> {
        self.page_layout()
            .page_margins
            .iter()
            .find(|m| m.applies_to(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn margins(kind: OddEvenBoth, left: f64) -> PageMargins {
        PageMargins { kind, left, right: left, top: 0.0, bottom: 0.0 }
    }

    #[test]
    fn test_margins_by_page_parity() {
        let print = PrintData {
            page_layout: Some(PageLayout {
                page_width: 1000.0,
                page_height: 1000.0,
                page_margins: vec![margins(OddEvenBoth::Odd, 11.0), margins(OddEvenBoth::Even, 21.0)],
            }),
            ..Default::default()
        };
        assert_eq!(print.page_margins_for(1).map(|m| m.left), Some(11.0));
        assert_eq!(print.page_margins_for(2).map(|m| m.left), Some(21.0));
        assert_eq!(print.page_margins_for(3).map(|m| m.left), Some(11.0));
    }

    #[test]
    fn test_inherit_fills_only_missing_blocks() {
        let previous = PrintData {
            page_layout: Some(PageLayout {
                page_width: 900.0,
                page_height: 1200.0,
                page_margins: vec![],
            }),
            system_layout: Some(SystemLayout::default()),
            ..Default::default()
        };
        let mut print = PrintData::default();
        assert!(print.inherit(&previous));
        assert_eq!(print.page_layout().page_width, 900.0);
        assert!(!print.inherit(&previous));
    }
}
