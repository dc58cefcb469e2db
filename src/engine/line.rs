//! Laying out one line of measures and stacking its staves vertically

use super::cache::{fingerprint, LineSignature, MeasureState};
use super::cursor::{LineContext, MeasureContext};
use super::layout::{MeasureLayout, PerStaff};
use super::line_bounds::LineBounds;
use super::line_breaker::LinePlan;
use super::measure::{layout_measure, MeasureEnv};
use super::EngineContext;
use crate::config::LayoutOptions;
use crate::error::Result;
use crate::models::Document;

/// Position of a line within the song
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePosition {
    pub line: usize,
    pub lines: usize,
}

/// Number of staves each part has at the end of `state`
fn staff_count(state: &MeasureState, part: &str) -> usize {
    let Some(staves) = state.end.get(part) else {
        return 0;
    };
    let seen = staves.keys().copied().max().unwrap_or(0);
    let declared = staves.get(&1).and_then(|s| s.staves).unwrap_or(seen);
    if declared > seen {
        log::warn!("part {} declares {} staves but only {} are present", part, declared, seen);
    }
    seen
}

/// Lay out the measures of `plan` left to right from `bounds.left`, then
/// assign staff origins top-down from `y`. `y` is left below the line's
/// system distance.
///
/// Committed measures on an unchanged line come from the cache; outside
/// preview, fresh layouts of committed measures are stored.
pub fn layout_line(
    ctx: &mut EngineContext,
    doc: &mut Document,
    states: &[MeasureState],
    plan: &LinePlan,
    position: LinePosition,
    bounds: &LineBounds,
    options: &LayoutOptions,
    y: &mut f64,
) -> Result<Vec<MeasureLayout>> {
    let parts = doc.part_ids();
    let count = doc.measures.len();
    let bars = plan.measures.len();
    let neighbors: Vec<_> = plan.measures.iter().map(|i| doc.measures[*i].uuid).collect();
    let mut layouts = Vec::with_capacity(bars);

    for (bar, idx) in plan.measures.iter().copied().enumerate() {
        let Document { header, measures } = &mut *doc;
        let measure = &mut measures[idx];
        let shortest_count = if options.single_line_mode {
            measure.shortest_div_count().unwrap_or(u32::MAX)
        } else {
            plan.shortest
        };
        let signature = LineSignature {
            neighbors: neighbors.clone(),
            shortest: shortest_count,
            line: position.line,
            lines: position.lines,
        };
        let fp = fingerprint(measure);
        if let Some(cached) = ctx.cache.layout(measure.uuid, fp, &signature) {
            layouts.push(cached.clone());
            continue;
        }

        let state = &states[idx];
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
            line: LineContext {
                shortest_count,
                bar_on_line: bar,
                bars_on_line: bars,
                line: position.line,
                lines: position.lines,
            },
            start: &state.start,
            print: state.start_print.as_ref(),
            approximate: false,
        };
        let layout = layout_measure(&env, measure, bar + 1 != bars)?;
        if !options.preview {
            ctx.cache.commit_layout(signature, layout.clone());
        }
        layouts.push(layout);
    }

    let mut x = bounds.left;
    for layout in layouts.iter_mut() {
        layout.origin_x = x;
        x += layout.width;
    }

    let mut tops: PerStaff<f64> = PerStaff::new();
    let mut staff_number = 0;
    if let Some(last) = plan.measures.last().map(|i| &states[*i]) {
        for part in &parts {
            for staff in 1..=staff_count(last, part) {
                staff_number += 1;
                if staff_number > 1 {
                    *y -= ctx.config.staff_distance;
                }
                let max_of = |padding: &PerStaff<f64>| {
                    padding
                        .get(part)
                        .and_then(|p| p.get(&staff))
                        .copied()
                        .unwrap_or(0.0)
                };
                let padding_top = layouts.iter().map(|l| max_of(&l.padding_top)).fold(0.0, f64::max);
                let padding_bottom = layouts.iter().map(|l| max_of(&l.padding_bottom)).fold(0.0, f64::max);
                let top = *y - padding_top;
                *y = top - padding_bottom;
                tops.entry(part.clone()).or_default().insert(staff, top);
            }
        }
    }
    *y -= bounds.system_distance(&ctx.config);

    for layout in layouts.iter_mut() {
        layout.origin_y = tops.clone();
    }
    Ok(layouts)
}
