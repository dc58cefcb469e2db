//! Center whole-bar elements between the leading attributes and the barline

use super::{column_len, LineInfo, Postprocessor};
use crate::engine::layout::{ExpandPolicy, MeasureLayout};
use crate::error::{EngineError, Result};
use crate::models::ModelKind;

/// Room gained when the following measure is hidden
const HIDDEN_NEXT_MEASURE_ROOM: f64 = 16.6;

pub struct Center;

/// Trailing space of a measure after its last column
fn trailing_space(measure: &MeasureLayout) -> f64 {
    let last_x = measure
        .elements
        .first()
        .and_then(|row| row.last())
        .map(|l| l.x)
        .unwrap_or(0.0);
    measure.width - last_x
}

impl Postprocessor for Center {
    fn name(&self) -> &'static str {
        "center"
    }

    fn apply(&self, _line: &LineInfo, mut layouts: Vec<MeasureLayout>) -> Result<Vec<MeasureLayout>> {
        for idx in 0..layouts.len() {
            let previous_trailing = idx.checked_sub(1).map(|p| trailing_space(&layouts[p]));
            let next_hidden = layouts.get(idx + 1).map(|m| m.width == 0.0).unwrap_or(false);
            let measure = &mut layouts[idx];

            let attributes = measure.elements.first().and_then(|row| {
                row.iter().enumerate().find_map(|(j, l)| {
                    let width = l.rendered_width.filter(|w| *w > 0.0)?;
                    (l.kind == ModelKind::Attributes).then_some((j, l.x + width))
                })
            });

            for j in 0..column_len(measure) {
                for row in measure.elements.iter_mut() {
                    let Some(end) = row.last().map(|l| l.x) else {
                        continue;
                    };
                    let Some(element) = row.get_mut(j) else {
                        continue;
                    };
                    if element.expand_policy != ExpandPolicy::Centered {
                        continue;
                    }
                    let Some(width) = element.rendered_width.filter(|w| w.is_finite()) else {
                        return Err(EngineError::Invariant(format!(
                            "centered {:?} in measure {} has no rendered width",
                            element.kind, measure.number
                        )));
                    };

                    let (base, mut remaining) = match (attributes, previous_trailing) {
                        (Some((a, base)), _) if a < j => (base, end - base),
                        (_, Some(trailing)) => (0.0, end - trailing),
                        _ => (0.0, end),
                    };
                    if next_hidden {
                        remaining += HIDDEN_NEXT_MEASURE_ROOM;
                    }
                    element.x = base + remaining / 2.0 - width / 2.0;
                }
            }
        }
        Ok(layouts)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    fn whole_rest() -> crate::engine::layout::Layout {
        let mut rest = fixtures::element(ModelKind::Chord, 0, 40.0, Some(4));
        rest.expand_policy = ExpandPolicy::Centered;
        rest.rendered_width = Some(10.0);
        rest
    }

    #[test]
    fn test_rest_centered_after_attributes() {
        let mut measure = fixtures::measure(vec![vec![whole_rest()]], 100.0, 4);
        // leading attributes end at 30
        measure.elements[0][0].rendered_width = Some(30.0);
        let line = fixtures::Line::new(0.0, 1000.0);
        let out = Center.apply(&line.info(0, 1), vec![measure]).unwrap();
        let rest = out[0].elements[1]
            .iter()
            .find(|l| l.expand_policy == ExpandPolicy::Centered && !l.is_placeholder())
            .unwrap();
        // between 30 and the barline at 90: 30 + 60 / 2 - 5
        assert_eq!(rest.x, 55.0);
    }

    #[test]
    fn test_missing_rendered_width_is_an_invariant_error() {
        let mut rest = whole_rest();
        rest.rendered_width = None;
        let measure = fixtures::measure(vec![vec![rest]], 100.0, 4);
        let line = fixtures::Line::new(0.0, 1000.0);
        assert!(matches!(
            Center.apply(&line.info(0, 1), vec![measure]),
            Err(EngineError::Invariant(_))
        ));
    }
}
