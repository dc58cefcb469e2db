//! Attributes: default filling, snapshot threading and header spacing

use super::super::cursor::Cursor;
use super::super::layout::{Layout, LayoutDetail};
use super::super::patch;
use super::super::snapshot::{self, AttributesSnapshot};
use crate::error::Result;
use crate::models::{
    AttributesData, Clef, KeySignature, ModelKind, PartSymbol, PartSymbolKind, StaffDetails, Time,
};

pub const CLEF_INDENTATION: f64 = 7.0;
pub const CLEF_WIDTH: f64 = 24.0;
const NUMBER_SPACING: f64 = 28.0;
const PLUS_SPACING: f64 = 12.0;

/// Fill in everything a staff needs that neither this element nor the
/// snapshot before it provides, then publish the new snapshot. The fills
/// reach the document as field edits through the cursor.
pub fn validate(declared: &AttributesData, cursor: &mut Cursor) -> Result<()> {
    let parent = cursor.staff.attributes.clone();
    let staff = cursor.staff.idx;
    let mut data = declared.clone();

    if parent.divisions.is_none() && data.divisions.is_none() {
        data.divisions = Some(cursor.divisions);
    }

    if parent.clef.is_none() && data.clef_for(staff).is_none() {
        data.clefs.push(Clef::treble(staff));
    }
    for clef in data.clefs.iter_mut() {
        if clef.line.is_none() {
            clef.line = Some(clef.sign.standard_line());
        }
    }

    if parent.time.is_none() && data.times.is_empty() {
        data.times.push(Time::common());
    }

    if parent.key_signature.is_none() && data.key_signatures.is_empty() {
        data.key_signatures.push(KeySignature::c_major());
    }

    if parent.staves.is_none() && data.staves.is_none() {
        data.staves = Some(1);
    }
    let staves = data.staves.or(parent.staves).unwrap_or(1);
    if staves > 1 && parent.part_symbol.is_none() && data.part_symbol.is_none() {
        data.part_symbol = Some(PartSymbol {
            kind: PartSymbolKind::Brace,
            top_staff: Some(1),
            bottom_staff: Some(staves),
        });
    }

    if data.staff_details_for(staff).is_none() {
        data.staff_details.push(StaffDetails {
            number: staff,
            ..Default::default()
        });
    }
    if parent.staff_details.staff_lines.is_none() {
        if let Some(details) = data.staff_details.iter_mut().find(|d| d.number == staff) {
            if details.staff_lines.is_none() {
                details.staff_lines = Some(5);
            }
        }
    }

    let edits = patch::set_fields(cursor.measure.uuid, &cursor.segment, cursor.idx, declared, &data)?;
    if !edits.is_empty() {
        log::debug!(
            "measure {} {}: filling {} attribute field(s)",
            cursor.measure.number,
            cursor.segment,
            edits.len()
        );
        cursor.fixup(edits);
    }
    publish(&data, cursor, &parent);
    Ok(())
}

fn publish(data: &AttributesData, cursor: &mut Cursor, parent: &AttributesSnapshot) {
    let next = snapshot::create(parent, data, cursor.staff.idx, cursor.measure.idx);
    cursor.staff.total_divisions = snapshot::bar_divisions(&next);
    cursor.staff.attributes = next;
}

/// Width of the time signature glyphs
pub fn time_width(time: Option<&Time>) -> f64 {
    match time {
        Some(time) if !time.beat_types.is_empty() => {
            NUMBER_SPACING * time.numerator_segments() as f64
                + (time.beat_types.len() as f64 - 1.0) * PLUS_SPACING
        }
        _ => 0.0,
    }
}

/// Width of the key signature glyphs; negative for an empty signature
pub fn key_width(key: Option<&KeySignature>) -> f64 {
    match key {
        Some(key) if key.fifths != 0 => {
            2.0 + key.accidentals().iter().map(|a| a.width()).sum::<f64>()
        }
        Some(_) => -5.0,
        None => 0.0,
    }
}

pub fn layout(data: &AttributesData, cursor: &mut Cursor) -> Result<Layout> {
    let parent = cursor.staff.attributes.clone();
    publish(data, cursor, &parent);

    let staff = cursor.staff.idx;
    let mut layout = Layout::new(ModelKind::Attributes, cursor.part(), staff, cursor.x, cursor.division);
    let start_x = cursor.x;
    let first_in_line = cursor.line.is_first_bar() && cursor.division == 0;

    let next_is_note = cursor.next.map(|n| n.kind == ModelKind::Chord).unwrap_or(false);
    let next_accidental = cursor.next.map(|n| n.has_accidental).unwrap_or(false);

    let key_visible = !data.key_signatures.is_empty() || first_in_line;
    let time_visible = !data.times.is_empty();
    let clef_changed = data
        .clef_for(staff)
        .map(|c| parent.clef.as_ref() != Some(c))
        .unwrap_or(false);
    let clef_visible = first_in_line || clef_changed;

    let current = &cursor.staff.attributes;
    let mut x = start_x;

    let clef_spacing = if clef_visible {
        x += CLEF_INDENTATION;
        let mut contextual = if next_is_note && !key_visible && !time_visible {
            if next_accidental {
                15.0
            } else {
                25.0
            }
        } else {
            12.5
        };
        if !first_in_line {
            contextual -= 19.8;
        }
        CLEF_WIDTH + contextual
    } else {
        0.0
    };

    let key_spacing = if key_visible {
        let contextual = if next_is_note && !time_visible {
            if next_accidental {
                25.0
            } else {
                15.0
            }
        } else {
            10.0
        };
        contextual + key_width(current.key_signature.as_ref())
    } else {
        0.0
    };

    let time_spacing = if time_visible {
        let declared_metered = data.times.first().map(|t| !t.beat_types.is_empty()).unwrap_or(false);
        let contextual = if !declared_metered {
            0.0
        } else if next_is_note {
            if next_accidental {
                25.0
            } else {
                15.0
            }
        } else {
            12.5
        };
        contextual + time_width(current.time.as_ref())
    } else {
        0.0
    };

    let measure_number = (first_in_line
        && !cursor.measure.implicit
        && cursor.measure.number.parse::<i64>().map(|n| n != 1).unwrap_or(true))
    .then(|| cursor.measure.number.clone());

    layout.x = x;
    cursor.x = x + clef_spacing + key_spacing + time_spacing;
    layout.rendered_width = Some((cursor.x - x - 8.0).max(0.0));
    layout.detail = LayoutDetail::Attributes {
        clef_spacing,
        key_spacing,
        time_spacing,
        measure_number,
    };
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Accidental;

    #[test]
    fn test_time_width_counts_numerator_groups() {
        assert_eq!(time_width(Some(&Time::common())), 28.0);
        let composite = Time {
            beats: vec!["3+2".into(), "2".into()],
            beat_types: vec![8, 4],
            symbol: None,
            senza_misura: false,
        };
        assert_eq!(time_width(Some(&composite)), 28.0 * 3.0 + 12.0);
        assert_eq!(time_width(None), 0.0);
    }

    #[test]
    fn test_key_width() {
        assert_eq!(key_width(Some(&KeySignature::c_major())), -5.0);
        let d_major = KeySignature { fifths: 2, mode: None };
        assert_eq!(key_width(Some(&d_major)), 2.0 + 2.0 * Accidental::Sharp.width());
        let e_flat = KeySignature { fifths: -3, mode: None };
        assert_eq!(key_width(Some(&e_flat)), 2.0 + 3.0 * Accidental::Flat.width());
    }
}
