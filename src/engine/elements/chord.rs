//! Chord sizing and placement

use super::super::cursor::Cursor;
use super::super::layout::{BoundingBox, ExpandPolicy, Layout, LayoutDetail};
use crate::error::{EngineError, Result};
use crate::models::{ChordData, Clef, ModelKind, Note};

const BASE_WIDTH: f64 = 22.8;
const GRACE_BASE_WIDTH: f64 = 11.4;
/// Extra width per unit of ln(duration / shortest)
const LOG_SPACING: f64 = 20.0;
/// Accidentals may be squished slightly
const ACCIDENTAL_SQUISH: f64 = 0.73;
const DOT_WIDTH: f64 = 6.0;
const NOTEHEAD_WIDTH: f64 = 11.8;
const LYRIC_HEIGHT: f64 = 12.0;
const LYRIC_BASELINE: f64 = -70.0;
const LYRIC_LINE_SPACING: f64 = 20.0;

/// Horizontal space a chord of `div_count` gets when the shortest duration
/// assumed on its line is `shortest`
pub fn spacing_width(div_count: u32, shortest: u32, grace: bool) -> f64 {
    let base = if grace { GRACE_BASE_WIDTH } else { BASE_WIDTH };
    if div_count == 0 || shortest == 0 {
        return base;
    }
    let mut extra = ((div_count as f64).ln() - (shortest as f64).ln()).max(0.0) * LOG_SPACING;
    if grace {
        extra /= 10.0;
    }
    base + extra
}

/// Full advance of a chord, including accidentals and dots
pub fn total_width(chord: &ChordData, div_count: u32, shortest: u32, hide_dots: bool) -> f64 {
    let dots = if hide_dots { 0.0 } else { chord.max_dots() as f64 * DOT_WIDTH };
    spacing_width(div_count, shortest, chord.grace) + chord.accidental_width() * ACCIDENTAL_SQUISH + dots
}

/// Staff line (1 = bottom line) of a note; rests sit on the middle line
pub fn line_for(note: &Note, clef: &Clef) -> f64 {
    match &note.pitch {
        Some(pitch) => clef.line_offset() + (pitch.octave - 3) as f64 * 3.5 + pitch.step.line_offset(),
        None => 3.0,
    }
}

pub fn validate(chord: &ChordData, div_count: u32, cursor: &mut Cursor) -> Result<()> {
    if cursor.staff.attributes.clef.is_none() {
        return Err(EngineError::MissingSnapshot {
            measure: cursor.measure.uuid,
            part: cursor.part().to_string(),
            staff: cursor.staff.idx,
        });
    }
    if chord.grace && div_count > 0 {
        log::warn!(
            "grace chord in measure {} has duration {}; spacing treats it as grace",
            cursor.measure.number,
            div_count
        );
    }
    Ok(())
}

pub fn layout(chord: &ChordData, div_count: u32, cursor: &mut Cursor) -> Result<Layout> {
    let staff = cursor.staff.idx;
    let mut layout = Layout::new(ModelKind::Chord, cursor.part(), staff, cursor.x, cursor.division);
    layout.div_count = Some(div_count);

    let style = &cursor.staff.attributes.measure_style;
    if style.hidden_by_multiple_rest() {
        layout.detail = LayoutDetail::Chord {
            lines: Vec::new(),
            accidental_width: 0.0,
            dots: 0,
            hidden: true,
        };
        return Ok(layout);
    }
    let in_multiple_rest = style.multiple_rest.as_ref().map(|r| r.count > 1).unwrap_or(false);

    let clef = cursor
        .staff
        .attributes
        .clef
        .clone()
        .ok_or_else(|| EngineError::MissingSnapshot {
            measure: cursor.measure.uuid,
            part: cursor.part().to_string(),
            staff,
        })?;

    let whole_bar = chord.is_whole_bar_rest() || (in_multiple_rest && chord.is_rest());
    layout.expand_policy = if whole_bar {
        ExpandPolicy::Centered
    } else {
        ExpandPolicy::After
    };

    let lines: Vec<f64> = chord
        .notes
        .iter()
        .filter(|n| n.pitch.is_some())
        .map(|n| line_for(n, &clef))
        .collect();
    for line in &lines {
        let default_y = (line - 3.0) * 10.0;
        cursor.reserve_padding(default_y - 50.0, -default_y - 25.0);
    }

    let accidental_width = chord.accidental_width() * ACCIDENTAL_SQUISH;
    let width = total_width(chord, div_count, cursor.line.shortest_count, whole_bar);
    let lyric_width = chord.lyric_width();

    layout.x = cursor.x + accidental_width;
    layout.rendered_width = Some(NOTEHEAD_WIDTH);
    layout.min_space_before = lyric_width / 2.0;
    layout.min_space_after = lyric_width / 2.0;

    for note in &chord.notes {
        if let Some(default_y) = note_y(note, &clef) {
            layout.bounding_boxes.push(
                BoundingBox::new(0.0, NOTEHEAD_WIDTH, -5.0, 5.0)
                    .at(0.0, default_y)
                    .fixed(),
            );
        }
        for (verse, lyric) in note.lyrics.iter().enumerate() {
            let w = lyric.text.chars().count() as f64 * crate::models::LYRIC_CHAR_WIDTH;
            let number = lyric.number.unwrap_or(verse + 1).max(1);
            let y = LYRIC_BASELINE - (number - 1) as f64 * LYRIC_LINE_SPACING;
            layout.bounding_boxes.push(
                BoundingBox::new(NOTEHEAD_WIDTH / 2.0 - w / 2.0, NOTEHEAD_WIDTH / 2.0 + w / 2.0, 0.0, LYRIC_HEIGHT)
                    .at(0.0, y),
            );
        }
    }

    layout.detail = LayoutDetail::Chord {
        lines,
        accidental_width,
        dots: if whole_bar { 0 } else { chord.max_dots() },
        hidden: false,
    };
    cursor.x += width;
    Ok(layout)
}

fn note_y(note: &Note, clef: &Clef) -> Option<f64> {
    note.pitch.as_ref().map(|_| (line_for(note, clef) - 3.0) * 10.0)
}
