//! Stretch lines to the page width
//!
//! Every column holding an expandable element grows in proportion to the
//! logarithm of its duration relative to the shortest duration on the line.
//! Full lines fill `right - left` exactly. The last line of a song is only
//! partially stretched, blending towards its natural width as the space to
//! fill grows.

use super::{column_len, LineInfo, Postprocessor};
use crate::engine::layout::{ExpandPolicy, Layout, MeasureLayout};
use crate::engine::snapshot::bar_divisions;
use crate::error::Result;

/// Slack kept at the end of a partially justified line
const PARTIAL_LINE_SLACK: f64 = 3.0;

pub struct Justify;

fn logistic(t: f64) -> f64 {
    1.0 / (1.0 + (-t).exp())
}

fn weight(div_count: u32, smallest: u32) -> f64 {
    f64::from(div_count).ln() - f64::from(smallest).ln() + 1.0
}

/// True when the measure uses fewer divisions than its time signature allows
fn underfilled(measure: &MeasureLayout, parts: &[String]) -> bool {
    parts
        .first()
        .and_then(|part| measure.attributes.get(part))
        .and_then(|staves| staves.get(&1))
        .and_then(bar_divisions)
        .map(|capacity| measure.max_divisions < capacity)
        .unwrap_or(false)
}

/// Smallest weight among the expandable elements of column `j`
fn column_weight(measure: &MeasureLayout, j: usize, smallest: u32, factor: f64) -> Option<f64> {
    measure
        .elements
        .iter()
        .filter_map(|row| row.get(j))
        .filter_map(Layout::expandable_div_count)
        .map(|d| weight(d, smallest) * factor)
        .reduce(f64::min)
}

impl Postprocessor for Justify {
    fn name(&self) -> &'static str {
        "justify"
    }

    fn apply(&self, line: &LineInfo, mut layouts: Vec<MeasureLayout>) -> Result<Vec<MeasureLayout>> {
        if line.options.preview || line.options.single_line_mode {
            return Ok(layouts);
        }

        let bounds = line.bounds;
        let x = bounds.left + layouts.iter().map(|m| m.width).sum::<f64>();

        let Some(smallest) = layouts
            .iter()
            .flat_map(|m| m.elements.iter().flatten())
            .filter_map(Layout::expandable_div_count)
            .min()
        else {
            return Ok(layouts);
        };

        let factors: Vec<f64> = layouts
            .iter()
            .map(|m| {
                if underfilled(m, line.parts) {
                    line.config.underfilled_weight
                } else {
                    1.0
                }
            })
            .collect();

        let column_weights: Vec<Vec<Option<f64>>> = layouts
            .iter()
            .zip(&factors)
            .map(|(m, factor)| {
                (0..column_len(m))
                    .map(|j| column_weight(m, j, smallest, *factor))
                    .collect()
            })
            .collect();
        let total: f64 = column_weights.iter().flatten().flatten().sum();
        if total <= 0.0 {
            return Ok(layouts);
        }
        let full_rate = (bounds.right - x) / total;

        let rate = if line.is_last_line() && x < bounds.right {
            let mut underfilled_count = 0usize;
            let mut count = 0.0;
            for (measure, factor) in layouts.iter().zip(&factors) {
                let Some(row) = measure.elements.last() else {
                    continue;
                };
                for element in row {
                    if *factor != 1.0 && element.expand_policy != ExpandPolicy::None {
                        underfilled_count += 1;
                    }
                    if let Some(d) = element.expandable_div_count() {
                        count += weight(d, smallest) * factor;
                    }
                }
            }
            if count <= 0.0 {
                0.0
            } else {
                let remaining = bounds.right - PARTIAL_LINE_SLACK - x;
                let guess = remaining
                    / (count + (1.0 - line.config.underfilled_weight) * underfilled_count as f64);
                let blend = logistic((guess - bounds.right / 80.0) / 20.0) * 2.0 / 3.0;
                ((1.0 - blend) * guess).min(full_rate)
            }
        } else {
            full_rate
        };

        let mut line_expansion = 0.0;
        for (measure, weights) in layouts.iter_mut().zip(&column_weights) {
            measure.origin_x += line_expansion;
            let mut expansion = 0.0;
            for (j, column) in weights.iter().enumerate() {
                for layout in measure.elements.iter_mut().filter_map(|row| row.get_mut(j)) {
                    layout.x += expansion;
                }
                if let Some(w) = column {
                    expansion += rate * w;
                }
            }
            measure.width += expansion;
            line_expansion += expansion;
        }

        log::debug!("justified {} measures at {:.3} per unit weight", layouts.len(), rate);
        Ok(layouts)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::models::ModelKind;

    fn chords(pattern: &[u32], start_x: f64) -> Vec<Layout> {
        let mut division = 0;
        let mut x = start_x;
        pattern
            .iter()
            .map(|d| {
                let chord = fixtures::element(ModelKind::Chord, division, x, Some(*d));
                division += d;
                x += f64::from(*d) * 10.0;
                chord
            })
            .collect()
    }

    fn full_measure() -> MeasureLayout {
        // 4 + 4 + 4 + 4 fills a 4/4 bar at 4 divisions per quarter
        fixtures::measure(vec![chords(&[4, 4, 4, 4], 10.0)], 100.0, 16)
    }

    #[test]
    fn test_weight_is_logarithmic() {
        assert_eq!(weight(1, 1), 1.0);
        assert!((weight(4, 1) - (4f64.ln() + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_non_final_line_fills_width() {
        let line = fixtures::Line::new(10.0, 510.0);
        let out = Justify
            .apply(&line.info(0, 2), vec![full_measure(), full_measure()])
            .unwrap();
        let width: f64 = out.iter().map(|m| m.width).sum();
        assert!((width - 500.0).abs() < 0.01);
        assert!((out[1].origin_x - out[0].width).abs() < 0.01);
    }

    #[test]
    fn test_final_line_expands_less_than_full_line() {
        let line = fixtures::Line::new(10.0, 510.0);
        let full = Justify.apply(&line.info(0, 2), vec![full_measure()]).unwrap();
        let last = Justify.apply(&line.info(1, 2), vec![full_measure()]).unwrap();
        assert!(last[0].width > 100.0);
        assert!(last[0].width < full[0].width);
    }

    #[test]
    fn test_preview_and_single_line_are_untouched() {
        let mut line = fixtures::Line::new(10.0, 510.0);
        line.options.preview = true;
        let out = Justify.apply(&line.info(0, 2), vec![full_measure()]).unwrap();
        assert_eq!(out[0].width, 100.0);

        line.options.preview = false;
        line.options.single_line_mode = true;
        let out = Justify.apply(&line.info(0, 2), vec![full_measure()]).unwrap();
        assert_eq!(out[0].width, 100.0);
    }

    #[test]
    fn test_nothing_expandable_is_untouched() {
        let line = fixtures::Line::new(10.0, 510.0);
        let measure = fixtures::measure(Vec::new(), 100.0, 0);
        let out = Justify.apply(&line.info(0, 2), vec![measure]).unwrap();
        assert_eq!(out[0].width, 100.0);
    }
}
