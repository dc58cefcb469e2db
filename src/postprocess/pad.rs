//! Enforce minimum spacing between columns
//!
//! A column that asks for room before or after itself pushes itself and every
//! later column right until the previous padded column's space is honored.
//! Measures grow by the total shift and later measures on the line move with
//! them.

use super::{column_len, LineInfo, Postprocessor};
use crate::engine::layout::MeasureLayout;
use crate::error::Result;

/// Start of the padding window before the first column of each measure
const MEASURE_START_END: f64 = -10.0;

pub struct Pad;

fn pad_measure(measure: &mut MeasureLayout) -> f64 {
    let mut previous_end = MEASURE_START_END;
    let mut offset = 0.0;

    for j in 0..column_len(measure) {
        let mut before: f64 = 0.0;
        let mut after: f64 = 0.0;
        let mut anchor = None;
        for row in measure.elements.iter_mut() {
            if let Some(layout) = row.get_mut(j) {
                layout.x += offset;
                before = before.max(layout.min_space_before);
                after = after.max(layout.min_space_after);
                anchor.get_or_insert(layout.x);
            }
        }
        let Some(x) = anchor else { continue };
        if before == 0.0 && after == 0.0 {
            continue;
        }

        let extra = (previous_end - (x - before)).max(0.0);
        if extra > 0.0 {
            for layout in measure.elements.iter_mut().filter_map(|row| row.get_mut(j)) {
                layout.x += extra;
            }
            offset += extra;
        }
        previous_end = x + extra + after;
    }

    measure.width += offset;
    offset
}

impl Postprocessor for Pad {
    fn name(&self) -> &'static str {
        "pad"
    }

    fn apply(&self, _line: &LineInfo, mut layouts: Vec<MeasureLayout>) -> Result<Vec<MeasureLayout>> {
        let mut measure_offset = 0.0;
        for measure in layouts.iter_mut() {
            measure.origin_x += measure_offset;
            measure_offset += pad_measure(measure);
        }
        Ok(layouts)
    }
}
