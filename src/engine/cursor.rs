//! Walk state handed to every element during validation and layout

use super::patch::Operation;
use super::registry::ModelRegistry;
use super::snapshot::AttributesSnapshot;
use crate::config::EngineConfig;
use crate::models::{ModelKind, PrintData, ScoreHeader, SegmentRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// State of the staff the current element renders on
#[derive(Debug, Clone, Default)]
pub struct StaffContext {
    pub idx: usize,
    pub attributes: AttributesSnapshot,
    /// Bar capacity; unknown until an Attributes element has been seen
    pub total_divisions: Option<u32>,
}

impl StaffContext {
    pub fn new(idx: usize, attributes: AttributesSnapshot) -> Self {
        let total_divisions = super::snapshot::bar_divisions(&attributes);
        Self {
            idx,
            attributes,
            total_divisions,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeasureContext {
    pub uuid: Uuid,
    pub idx: usize,
    pub number: String,
    pub implicit: bool,
    pub is_last_in_document: bool,
}

/// Where the measure being walked sits on its line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineContext {
    /// Shortest duration assumed when sizing chords
    pub shortest_count: u32,
    pub bar_on_line: usize,
    pub bars_on_line: usize,
    pub line: usize,
    pub lines: usize,
}

impl Default for LineContext {
    fn default() -> Self {
        Self {
            shortest_count: 1,
            bar_on_line: 0,
            bars_on_line: 1,
            line: 0,
            lines: 1,
        }
    }
}

impl LineContext {
    pub fn is_first_bar(&self) -> bool {
        self.bar_on_line == 0
    }

    pub fn is_last_bar(&self) -> bool {
        self.bar_on_line + 1 >= self.bars_on_line
    }

    pub fn is_last_line(&self) -> bool {
        self.line + 1 >= self.lines
    }
}

/// Lookahead on the element after the current one in its segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NextHint {
    pub kind: ModelKind,
    pub has_accidental: bool,
}

pub struct Cursor<'a> {
    pub header: &'a ScoreHeader,
    pub registry: &'a dyn ModelRegistry,
    pub config: &'a EngineConfig,

    pub segment: SegmentRef,
    /// Index of the current element within `segment`
    pub idx: usize,
    pub next: Option<NextHint>,

    pub division: u32,
    /// Divisions per quarter of the segment being walked
    pub divisions: u32,
    pub x: f64,

    pub staff: StaffContext,
    pub measure: MeasureContext,
    pub line: LineContext,
    /// Print in effect
    pub print: Option<PrintData>,

    pub max_padding_top: BTreeMap<usize, f64>,
    pub max_padding_bottom: BTreeMap<usize, f64>,

    /// Sizing for line breaking, not final layout
    pub approximate: bool,

    requests: Vec<Operation>,
}

impl<'a> Cursor<'a> {
    pub fn new(
        header: &'a ScoreHeader,
        registry: &'a dyn ModelRegistry,
        config: &'a EngineConfig,
        segment: SegmentRef,
        measure: MeasureContext,
        line: LineContext,
        x: f64,
    ) -> Self {
        Self {
            header,
            registry,
            config,
            segment,
            idx: 0,
            next: None,
            division: 0,
            divisions: 1,
            x,
            staff: StaffContext::default(),
            measure,
            line,
            print: None,
            max_padding_top: BTreeMap::new(),
            max_padding_bottom: BTreeMap::new(),
            approximate: false,
            requests: Vec::new(),
        }
    }

    pub fn part(&self) -> &str {
        &self.segment.part
    }

    /// Ask for a document change. The walk restarts once the current element
    /// returns.
    pub fn fixup(&mut self, operations: Vec<Operation>) {
        self.requests.extend(operations);
    }

    pub fn has_requests(&self) -> bool {
        !self.requests.is_empty()
    }

    pub fn take_requests(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.requests)
    }

    /// Record vertical extent needed above and below the current staff
    pub fn reserve_padding(&mut self, top: f64, bottom: f64) {
        let staff = self.staff.idx;
        let t = self.max_padding_top.entry(staff).or_insert(0.0);
        *t = t.max(top);
        let b = self.max_padding_bottom.entry(staff).or_insert(0.0);
        *b = b.max(bottom);
    }
}
