//! Barlines: bar filling and line geometry

use super::super::cursor::Cursor;
use super::super::layout::{Layout, LayoutDetail};
use super::super::patch::Operation;
use crate::error::Result;
use crate::models::{BarStyle, BarlineData, ModelKind};
use serde_json::json;

/// A barline reached before the staff is full asks for a spacer in front of
/// it covering the missing divisions.
pub fn validate(cursor: &mut Cursor) -> Result<()> {
    let Some(total) = cursor.staff.total_divisions else {
        return Ok(());
    };
    if total <= cursor.division {
        return Ok(());
    }
    let missing = total - cursor.division;
    let spacer = cursor
        .registry
        .from_spec(&json!({ "_class": "Spacer", "divCount": missing, "staffIdx": cursor.staff.idx }))?;
    log::debug!(
        "measure {} {}: filling {} divisions before barline",
        cursor.measure.number,
        cursor.segment,
        missing
    );
    let op = Operation::InsertModel {
        measure: cursor.measure.uuid,
        segment: cursor.segment.clone(),
        index: cursor.idx,
        model: spacer,
    };
    cursor.division += missing;
    cursor.fixup(vec![op]);
    Ok(())
}

/// Style used when none is declared: a final barline closes the last line
fn implied_style(cursor: &Cursor) -> BarStyle {
    let last_barline_in_segment = cursor.next.map_or(true, |n| n.kind != ModelKind::Barline);
    if !cursor.approximate
        && cursor.line.is_last_bar()
        && cursor.line.is_last_line()
        && last_barline_in_segment
    {
        BarStyle::LightHeavy
    } else {
        BarStyle::Regular
    }
}

pub fn layout(data: &BarlineData, cursor: &mut Cursor) -> Result<Layout> {
    let mut layout = Layout::new(
        ModelKind::Barline,
        cursor.part(),
        cursor.staff.idx,
        cursor.x,
        cursor.division,
    );

    let rest = &cursor.staff.attributes.measure_style.multiple_rest;
    if rest.as_ref().map(|r| r.count > 1).unwrap_or(false) {
        return Ok(layout);
    }

    let bar_style = data.bar_style.unwrap_or_else(|| implied_style(cursor));
    let widths = &cursor.header.defaults.line_widths;
    let (light, heavy) = (widths.light_barline, widths.heavy_barline);
    let lines: Vec<f64> = match bar_style {
        BarStyle::LightHeavy => vec![light, heavy],
        BarStyle::LightLight => vec![light, light],
        BarStyle::HeavyHeavy => vec![heavy, heavy],
        BarStyle::HeavyLight => vec![heavy, light],
        BarStyle::Regular
        | BarStyle::Dashed
        | BarStyle::Dotted
        | BarStyle::Short
        | BarStyle::Tick => vec![light],
        BarStyle::Heavy => vec![heavy],
        BarStyle::None => vec![],
    };

    let mut x = 0.0;
    let mut line_offsets = Vec::with_capacity(lines.len());
    for (idx, width) in lines.iter().enumerate() {
        if idx > 0 {
            x += widths.barline_separation;
        }
        line_offsets.push(x);
        x += width;
    }

    cursor.x += x;
    layout.rendered_width = Some(x);
    layout.detail = LayoutDetail::Barline {
        bar_style,
        line_offsets,
    };
    Ok(layout)
}
