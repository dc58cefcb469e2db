//! Attribute cascade
//!
//! Snapshots are immutable per-staff views of the attributes in effect at
//! some point of the score. A new snapshot is always built from the previous
//! one plus the explicit fields of one Attributes element, so inherited
//! values flow forward measure by measure.

use crate::models::{
    AttributesData, Clef, KeySignature, MultipleRest, PartSymbol, Repeat, StaffDetails,
    StartStop, Time, Transpose,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Measure styles in effect for one staff
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureStyleState {
    pub slash: Option<Repeat>,
    pub beat_repeat: Option<Repeat>,
    pub measure_repeat: Option<Repeat>,
    pub multiple_rest: Option<MultipleRest>,
    /// The multiple rest was declared in this snapshot's measure, so the
    /// count must not be decremented for it.
    pub multiple_rest_initiated_here: bool,
}

impl MeasureStyleState {
    /// Measure is swallowed by a multi-measure rest declared earlier
    pub fn hidden_by_multiple_rest(&self) -> bool {
        self.multiple_rest.is_some() && !self.multiple_rest_initiated_here
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributesSnapshot {
    /// Index of the measure the snapshot was taken in
    pub measure: usize,
    pub divisions: Option<u32>,
    pub clef: Option<Clef>,
    pub time: Option<Time>,
    pub key_signature: Option<KeySignature>,
    pub staff_details: StaffDetails,
    pub measure_style: MeasureStyleState,
    pub staves: Option<usize>,
    pub part_symbol: Option<PartSymbol>,
    pub transpose: Option<Transpose>,
    pub instruments: Option<String>,
}

/// Snapshots keyed by part id, then staff number
pub type PartAttributes = BTreeMap<String, BTreeMap<usize, AttributesSnapshot>>;

/// Merge `current`'s explicit fields for `staff` over `before`.
pub fn create(
    before: &AttributesSnapshot,
    current: &AttributesData,
    staff: usize,
    measure: usize,
) -> AttributesSnapshot {
    AttributesSnapshot {
        measure,
        divisions: current.divisions.or(before.divisions),
        clef: current
            .clef_for(staff)
            .cloned()
            .or_else(|| before.clef.clone()),
        time: current.times.first().cloned().or_else(|| before.time.clone()),
        key_signature: current
            .key_signatures
            .first()
            .cloned()
            .or_else(|| before.key_signature.clone()),
        staff_details: merge_staff_details(&before.staff_details, current.staff_details_for(staff)),
        measure_style: merge_measure_style(&before.measure_style, current, staff),
        staves: current.staves.or(before.staves),
        part_symbol: current
            .part_symbol
            .clone()
            .or_else(|| before.part_symbol.clone()),
        transpose: current
            .transposes
            .first()
            .cloned()
            .or_else(|| before.transpose.clone()),
        instruments: current
            .instruments
            .clone()
            .or_else(|| before.instruments.clone()),
    }
}

fn merge_staff_details(before: &StaffDetails, current: Option<&StaffDetails>) -> StaffDetails {
    let Some(current) = current else {
        return before.clone();
    };
    StaffDetails {
        number: current.number,
        staff_lines: current.staff_lines.or(before.staff_lines),
        staff_size: current.staff_size.or(before.staff_size),
        staff_type: current.staff_type.clone().or_else(|| before.staff_type.clone()),
        capo: current.capo.or(before.capo),
        show_frets: current.show_frets.clone().or_else(|| before.show_frets.clone()),
        staff_tunings: current
            .staff_tunings
            .clone()
            .or_else(|| before.staff_tunings.clone()),
    }
}

fn apply_repeat(slot: &mut Option<Repeat>, declared: &Option<Repeat>) {
    match declared {
        Some(r) if r.kind == StartStop::Start => *slot = Some(r.clone()),
        Some(_) => *slot = None,
        None => {}
    }
}

fn merge_measure_style(
    before: &MeasureStyleState,
    current: &AttributesData,
    staff: usize,
) -> MeasureStyleState {
    let mut state = before.clone();
    let mut declared_rest = None;

    for style in current
        .measure_styles
        .iter()
        .filter(|s| s.number.map_or(true, |n| n == staff))
    {
        apply_repeat(&mut state.slash, &style.slash);
        apply_repeat(&mut state.beat_repeat, &style.beat_repeat);
        apply_repeat(&mut state.measure_repeat, &style.measure_repeat);
        if let Some(rest) = &style.multiple_rest {
            declared_rest = Some(rest.clone());
        }
    }

    match declared_rest {
        Some(rest) => {
            state.multiple_rest = Some(rest);
            state.multiple_rest_initiated_here = true;
        }
        None => {
            state.multiple_rest_initiated_here = false;
            state.multiple_rest = state.multiple_rest.take().and_then(|mut rest| {
                rest.count = rest.count.saturating_sub(1);
                (rest.count > 0).then_some(rest)
            });
        }
    }
    state
}

/// Capacity of one bar in divisions. `None` when time or divisions are unknown
/// or the time is unmetered.
pub fn bar_divisions(snapshot: &AttributesSnapshot) -> Option<u32> {
    let divisions = snapshot.divisions?;
    snapshot.time.as_ref()?.bar_divisions(divisions)
}
