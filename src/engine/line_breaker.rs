//! Packing measures into lines
//!
//! Each measure is sized approximately at every shortest duration a line
//! containing it could assume. Lines are then filled greedily; when a measure
//! with a shorter duration joins a line, the measures already on it are
//! re-measured at the new assumption.

use super::cache::MeasureState;
use super::cursor::{LineContext, MeasureContext};
use super::line_bounds::LineBounds;
use super::measure::{layout_measure, MeasureEnv};
use super::EngineContext;
use crate::config::{EngineConfig, LayoutOptions};
use crate::error::Result;
use crate::models::{find_print, Document, PrintData};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Width estimates of one measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementHint {
    pub uuid: Uuid,
    /// Shortest voice duration in the measure; `u32::MAX` when it has none
    pub shortest: u32,
    /// Estimated width keyed by the assumed shortest duration
    pub widths: BTreeMap<u32, f64>,
    /// Width that overrides every estimate
    pub forced_width: Option<f64>,
    /// Print in effect at the end of the measure
    pub print: Option<PrintData>,
    /// The measure's own Print asks for a new system or page
    #[serde(default)]
    pub new_system: bool,
}

impl PlacementHint {
    pub fn width_at(&self, shortest: u32) -> f64 {
        if let Some(width) = self.forced_width {
            return width;
        }
        self.widths
            .range(..=shortest)
            .next_back()
            .or_else(|| self.widths.iter().next())
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }
}

/// Measures assigned to one line
#[derive(Debug, Clone, PartialEq)]
pub struct LinePlan {
    pub measures: Vec<usize>,
    /// Shortest duration assumed for the whole line
    pub shortest: u32,
    /// Print of the line's first measure
    pub print: Option<PrintData>,
}

fn valid_width(width: f64) -> bool {
    width.is_finite() && width > 0.0
}

fn forced_width(doc: &Document, idx: usize, state: &MeasureState, options: &LayoutOptions) -> Option<f64> {
    let hidden = state
        .end
        .values()
        .filter_map(|staves| staves.get(&1))
        .map(|s| s.measure_style.hidden_by_multiple_rest())
        .fold(None, |all, hidden| Some(all.unwrap_or(true) && hidden))
        .unwrap_or(false);
    if hidden {
        return Some(0.0);
    }
    if let Some(width) = options.fixed_measure_width {
        return Some(width);
    }
    let measure = &doc.measures[idx];
    match measure.width {
        Some(width) if valid_width(width) => Some(width),
        Some(width) => {
            log::warn!("measure {}: ignoring invalid width {}", measure.number, width);
            None
        }
        None => None,
    }
}

/// Size every measure for line breaking
pub fn placement_hints(
    ctx: &EngineContext,
    doc: &mut Document,
    states: &[MeasureState],
    options: &LayoutOptions,
) -> Result<Vec<PlacementHint>> {
    let parts = doc.part_ids();
    let breaks: Vec<bool> = doc
        .measures
        .iter()
        .map(|m| {
            parts
                .first()
                .and_then(|part| find_print(m, part))
                .map_or(false, |print| print.new_system || print.new_page)
        })
        .collect();
    let own_shortest: Vec<u32> = doc
        .measures
        .iter()
        .map(|m| m.shortest_div_count().unwrap_or(u32::MAX))
        .collect();
    let mut candidates: BTreeSet<u32> = own_shortest.iter().copied().filter(|s| *s != u32::MAX).collect();
    if candidates.is_empty() {
        candidates.insert(1);
    }

    let mut hints = Vec::with_capacity(states.len());
    for (idx, state) in states.iter().enumerate() {
        let forced = forced_width(doc, idx, state, options);
        let shortest = own_shortest[idx];
        let mut widths = BTreeMap::new();

        if forced.is_none() {
            let count = doc.measures.len();
            let Document { header, measures } = &mut *doc;
            let measure = &mut measures[idx];
            for assumed in candidates.iter().copied().filter(|c| *c <= shortest) {
                let env = MeasureEnv {
                    header: &*header,
                    registry: ctx.registry.as_ref(),
                    config: &ctx.config,
                    parts: &parts,
                    context: MeasureContext {
                        uuid: measure.uuid,
                        idx,
                        number: measure.number.clone(),
                        implicit: measure.implicit,
                        is_last_in_document: idx + 1 == count,
                    },
                    // Somewhere mid-line: line start and end are reserved separately
                    line: LineContext {
                        shortest_count: assumed,
                        bar_on_line: 1,
                        bars_on_line: 3,
                        line: 0,
                        lines: 2,
                    },
                    start: &state.start,
                    print: state.start_print.as_ref(),
                    approximate: true,
                };
                let layout = layout_measure(&env, measure, true)?;
                widths.insert(assumed, layout.width);
            }
        }

        hints.push(PlacementHint {
            uuid: state.uuid,
            shortest,
            widths,
            forced_width: forced,
            print: state.end_print.clone(),
            new_system: breaks[idx],
        });
    }
    Ok(hints)
}

/// Assign measures to lines so every line fits the width budget. A line
/// always receives at least one measure; a measure asking for a new system
/// always opens one.
pub fn break_lines(
    hints: &[PlacementHint],
    bounds: &LineBounds,
    config: &EngineConfig,
    options: &LayoutOptions,
) -> Vec<LinePlan> {
    if hints.is_empty() {
        return Vec::new();
    }
    if options.single_line_mode {
        return vec![LinePlan {
            measures: (0..hints.len()).collect(),
            shortest: hints.iter().map(|h| h.shortest).min().unwrap_or(u32::MAX),
            print: hints[0].print.clone(),
        }];
    }

    let budget = bounds.width() / config.squishiness
        - config.attributes_width_start
        - config.attributes_width_end;

    let mut lines = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut shortest = u32::MAX;
    let mut width = 0.0;

    for (idx, hint) in hints.iter().enumerate() {
        let assumed = shortest.min(hint.shortest);
        let placed = if assumed != shortest {
            current.iter().map(|j| hints[*j].width_at(assumed)).sum()
        } else {
            width
        };
        let added = hint.width_at(assumed);

        if !current.is_empty() && (hint.new_system || placed + added > budget) {
            lines.push(LinePlan {
                print: hints[current[0]].print.clone(),
                measures: std::mem::take(&mut current),
                shortest,
            });
            shortest = hint.shortest;
            width = hint.width_at(shortest);
        } else {
            shortest = assumed;
            width = placed + added;
        }
        current.push(idx);
    }
    lines.push(LinePlan {
        print: hints[current[0]].print.clone(),
        measures: current,
        shortest,
    });

    log::debug!("broke {} measures into {} lines", hints.len(), lines.len());
    lines
}
