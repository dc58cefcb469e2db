//! Layout values produced by the measure walk
//!
//! Layouts are plain data computed eagerly by each element. Postprocessing
//! stages rewrite copies of them; nothing here refers back to the document.

use super::snapshot::PartAttributes;
use crate::models::{BarStyle, ModelKind, PrintData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Values keyed by part id, then staff number
pub type PerStaff<T> = BTreeMap<String, BTreeMap<usize, T>>;

/// How justification may stretch the space around an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpandPolicy {
    #[default]
    None,
    /// Placed in the middle of the measure (whole-bar rests)
    Centered,
    /// Space after the element grows
    After,
}

/// A box that the overlap remover may shift.
///
/// `left/right/top/bottom` are relative to (`default_x`, `default_y`), which
/// are themselves relative to the owning layout. Y grows upward.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub default_x: f64,
    pub default_y: f64,
    /// Displacement chosen by the overlap remover
    pub relative_x: f64,
    pub relative_y: f64,
    /// Never moved
    pub fixed: bool,
}

impl BoundingBox {
    pub fn new(left: f64, right: f64, bottom: f64, top: f64) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
            ..Default::default()
        }
    }

    pub fn at(mut self, default_x: f64, default_y: f64) -> Self {
        self.default_x = default_x;
        self.default_y = default_y;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }
}

/// Kind-specific render data
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayoutDetail {
    #[default]
    None,
    #[serde(rename_all = "camelCase")]
    Attributes {
        clef_spacing: f64,
        key_spacing: f64,
        time_spacing: f64,
        measure_number: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Chord {
        /// Staff line of each note (1 = bottom line); rests are omitted
        lines: Vec<f64>,
        accidental_width: f64,
        dots: u32,
        hidden: bool,
    },
    #[serde(rename_all = "camelCase")]
    Barline {
        bar_style: BarStyle,
        /// X offsets of each drawn line relative to the layout x
        line_offsets: Vec<f64>,
    },
    Print(PrintData),
}

/// Position and spacing data of one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    /// Key of the element; `None` for alignment placeholders
    pub key: Option<Uuid>,
    /// Render class (a proxy lays out as its target's kind)
    pub kind: ModelKind,
    pub part: String,
    pub staff: usize,
    pub x: f64,
    pub division: u32,
    /// Duration of the element, if it has one
    pub div_count: Option<u32>,
    pub min_space_before: f64,
    pub min_space_after: f64,
    pub bounding_boxes: Vec<BoundingBox>,
    pub expand_policy: ExpandPolicy,
    pub rendered_width: Option<f64>,
    pub detail: LayoutDetail,
}

impl Layout {
    pub fn new(kind: ModelKind, part: &str, staff: usize, x: f64, division: u32) -> Self {
        Self {
            key: None,
            kind,
            part: part.to_string(),
            staff,
            x,
            division,
            div_count: None,
            min_space_before: 0.0,
            min_space_after: 0.0,
            bounding_boxes: Vec::new(),
            expand_policy: ExpandPolicy::None,
            rendered_width: None,
            detail: LayoutDetail::None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.key.is_none()
    }

    /// Alignment stand-in keeping only position, class and expansion data
    pub fn placeholder(&self) -> Layout {
        Layout {
            key: None,
            kind: self.kind,
            part: self.part.clone(),
            staff: self.staff,
            x: self.x,
            division: self.division,
            div_count: None,
            min_space_before: 0.0,
            min_space_after: 0.0,
            bounding_boxes: Vec::new(),
            expand_policy: self.expand_policy,
            rendered_width: self.rendered_width,
            detail: LayoutDetail::None,
        }
    }

    fn order(&self) -> (u32, u32) {
        (self.division, self.kind.priority())
    }

    /// Weight source for justification: a real element with a duration
    pub fn expandable_div_count(&self) -> Option<u32> {
        if self.is_placeholder() || self.expand_policy == ExpandPolicy::None {
            return None;
        }
        self.div_count.filter(|d| *d > 0)
    }
}

/// Line up `segment` with `master` in place.
///
/// Items are ordered by (division, render priority). An item present in only
/// one list is copied into the other as a placeholder; items present in both
/// are moved to the largest x seen so far. Running this over every list twice
/// aligns all of them.
pub fn merge_segments(master: &mut Vec<Layout>, segment: &mut Vec<Layout>) {
    let mut i = 0;
    let mut x: f64 = 0.0;
    while i < master.len() || i < segment.len() {
        let a = master.get(i).map(Layout::order).unwrap_or((u32::MAX, u32::MAX));
        let b = segment.get(i).map(Layout::order).unwrap_or((u32::MAX, u32::MAX));
        if a < b {
            let copy = master[i].placeholder();
            x = copy.x;
            segment.insert(i, copy);
        } else if b < a {
            let copy = segment[i].placeholder();
            x = copy.x;
            master.insert(i, copy);
        } else {
            x = x.max(master[i].x).max(segment[i].x);
            master[i].x = x;
            segment[i].x = x;
        }
        i += 1;
    }
}

/// Merge every list into a shared column structure.
///
/// `staff_lists` holds one list per (part, staff) pair, `voice_lists` one per
/// voice. Returns the aligned rows: staves first, then voices.
pub fn align(mut staff_lists: Vec<Vec<Layout>>, mut voice_lists: Vec<Vec<Layout>>) -> Vec<Vec<Layout>> {
    let mut master = Vec::new();
    for list in staff_lists.iter_mut().chain(voice_lists.iter_mut()) {
        merge_segments(&mut master, list);
    }
    for list in voice_lists.iter_mut() {
        merge_segments(&mut master, list);
    }
    for list in staff_lists.iter_mut() {
        merge_segments(&mut master, list);
    }
    staff_lists.into_iter().chain(voice_lists).collect()
}

/// Geometry of one measure on a line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureLayout {
    pub uuid: Uuid,
    pub number: String,
    pub version: u64,
    /// Snapshots in effect at the start of the measure
    pub attributes: PartAttributes,
    /// Snapshots in effect at the end of the measure
    pub end_attributes: PartAttributes,
    pub print: Option<PrintData>,
    /// Aligned rows: every row has the same length and column `j` of every
    /// row shares one division and render class
    pub elements: Vec<Vec<Layout>>,
    pub width: f64,
    pub max_divisions: u32,
    pub origin_x: f64,
    pub origin_y: PerStaff<f64>,
    pub padding_top: PerStaff<f64>,
    pub padding_bottom: PerStaff<f64>,
}

impl MeasureLayout {
    pub fn column_count(&self) -> usize {
        self.elements.first().map(Vec::len).unwrap_or(0)
    }
}
