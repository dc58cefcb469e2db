//! Push overlapping boxes apart
//!
//! Every bounding box of a measure becomes an absolute rectangle. Boxes are
//! first separated vertically, then any overlap that remains is separated
//! horizontally. The displacement lands in `relative_x`/`relative_y`; fixed
//! boxes never move.

use super::vpsc::{solve, Constraint, Variable};
use super::{LineInfo, Postprocessor};
use crate::engine::layout::{BoundingBox, MeasureLayout};
use crate::error::Result;

/// Size given to boxes that were authored with no extent
const MIN_EXTENT: f64 = 0.01;
const EPSILON: f64 = 1e-6;

pub struct RemoveOverlaps;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone)]
struct Rect {
    row: usize,
    col: usize,
    index: usize,
    left: f64,
    right: f64,
    bottom: f64,
    top: f64,
    /// Position before solving: (left, bottom)
    origin: (f64, f64),
    fixed: bool,
}

impl Rect {
    fn span(&self, axis: Axis) -> (f64, f64) {
        match axis {
            Axis::X => (self.left, self.right),
            Axis::Y => (self.bottom, self.top),
        }
    }

    fn center(&self, axis: Axis) -> f64 {
        let (lo, hi) = self.span(axis);
        (lo + hi) / 2.0
    }

    fn size(&self, axis: Axis) -> f64 {
        let (lo, hi) = self.span(axis);
        hi - lo
    }

    fn shift(&mut self, axis: Axis, d: f64) {
        match axis {
            Axis::X => {
                self.left += d;
                self.right += d;
            }
            Axis::Y => {
                self.bottom += d;
                self.top += d;
            }
        }
    }

    fn overlaps(&self, other: &Rect, axis: Axis) -> bool {
        let (a0, a1) = self.span(axis);
        let (b0, b1) = other.span(axis);
        a0 < b1 - EPSILON && b0 < a1 - EPSILON
    }
}

fn sanitize(b: &mut BoundingBox) -> bool {
    if [b.left, b.right, b.top, b.bottom].iter().any(|v| v.is_nan()) {
        log::warn!(
            "skipping box with NaN extent {{left: {}, right: {}, top: {}, bottom: {}}}",
            b.left,
            b.right,
            b.top,
            b.bottom
        );
        return false;
    }
    if b.left >= b.right {
        log::warn!("box left >= right ({} >= {})", b.left, b.right);
        b.right = b.left + MIN_EXTENT;
    }
    if b.bottom >= b.top {
        log::warn!("box bottom >= top ({} >= {})", b.bottom, b.top);
        b.top = b.bottom + MIN_EXTENT;
    }
    true
}

fn collect(measure: &mut MeasureLayout) -> Vec<Rect> {
    let mut rects = Vec::new();
    for (row, elements) in measure.elements.iter_mut().enumerate() {
        for (col, layout) in elements.iter_mut().enumerate() {
            let origin_y = measure
                .origin_y
                .get(&layout.part)
                .and_then(|staves| staves.get(&layout.staff))
                .copied()
                .unwrap_or(0.0);
            let x = measure.origin_x + layout.x;
            for (index, b) in layout.bounding_boxes.iter_mut().enumerate() {
                if !sanitize(b) {
                    continue;
                }
                let left = x + b.default_x + b.left;
                let bottom = origin_y + b.default_y + b.bottom;
                rects.push(Rect {
                    row,
                    col,
                    index,
                    left,
                    right: x + b.default_x + b.right,
                    bottom,
                    top: origin_y + b.default_y + b.top,
                    origin: (left, bottom),
                    fixed: b.fixed,
                });
            }
        }
    }
    rects
}

/// Separate rectangles that overlap across `axis` by moving them along it
fn separate(rects: &mut [Rect], axis: Axis) {
    let across = match axis {
        Axis::X => Axis::Y,
        Axis::Y => Axis::X,
    };
    let variables: Vec<Variable> = rects
        .iter()
        .map(|r| Variable::new(r.center(axis), r.fixed))
        .collect();

    let mut constraints = Vec::new();
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            let (a, b) = (&rects[i], &rects[j]);
            if (a.fixed && b.fixed) || !a.overlaps(b, across) {
                continue;
            }
            let (left, right) = if (a.center(axis), i) <= (b.center(axis), j) {
                (i, j)
            } else {
                (j, i)
            };
            constraints.push(Constraint {
                left,
                right,
                gap: (a.size(axis) + b.size(axis)) / 2.0,
            });
        }
    }
    if constraints.is_empty() {
        return;
    }

    let positions = solve(&variables, &constraints);
    for (rect, (var, position)) in rects.iter_mut().zip(variables.iter().zip(positions)) {
        if !rect.fixed {
            rect.shift(axis, position - var.desired);
        }
    }
}

impl Postprocessor for RemoveOverlaps {
    fn name(&self) -> &'static str {
        "remove_overlaps"
    }

    fn apply(&self, _line: &LineInfo, mut layouts: Vec<MeasureLayout>) -> Result<Vec<MeasureLayout>> {
        for measure in layouts.iter_mut() {
            let mut rects = collect(measure);
            if rects.len() < 2 {
                continue;
            }
            separate(&mut rects, Axis::Y);
            separate(&mut rects, Axis::X);

            for rect in rects.iter().filter(|r| !r.fixed) {
                let b = &mut measure.elements[rect.row][rect.col].bounding_boxes[rect.index];
                b.relative_x = rect.left - rect.origin.0;
                b.relative_y = rect.bottom - rect.origin.1;
            }
        }
        Ok(layouts)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::models::ModelKind;

    fn with_boxes(boxes: Vec<BoundingBox>) -> MeasureLayout {
        let mut chord = fixtures::element(ModelKind::Chord, 0, 20.0, Some(4));
        chord.bounding_boxes = boxes;
        fixtures::measure(vec![vec![chord]], 100.0, 4)
    }

    fn boxes_of(measure: &MeasureLayout) -> Vec<&BoundingBox> {
        measure
            .elements
            .iter()
            .flatten()
            .flat_map(|l| l.bounding_boxes.iter())
            .collect()
    }

    #[test]
    fn test_free_box_moves_away_from_fixed_box() {
        let notehead = BoundingBox::new(0.0, 10.0, 0.0, 10.0).fixed();
        // slightly lower than the notehead and overlapping it
        let word = BoundingBox::new(0.0, 30.0, -4.0, 6.0);
        let line = fixtures::Line::new(0.0, 1000.0);
        let out = RemoveOverlaps
            .apply(&line.info(0, 1), vec![with_boxes(vec![notehead.clone(), word])])
            .unwrap();

        let boxes = boxes_of(&out[0]);
        assert_eq!(*boxes[0], notehead);
        // pushed down until its top meets the notehead's bottom
        assert_eq!(boxes[1].relative_x, 0.0);
        assert!((boxes[1].relative_y - -6.0).abs() < 1e-6);
    }

    #[test]
    fn test_separated_boxes_stay_put() {
        let a = BoundingBox::new(0.0, 10.0, 0.0, 10.0);
        let b = BoundingBox::new(0.0, 10.0, 20.0, 30.0);
        let line = fixtures::Line::new(0.0, 1000.0);
        let out = RemoveOverlaps
            .apply(&line.info(0, 1), vec![with_boxes(vec![a, b])])
            .unwrap();
        assert!(boxes_of(&out[0]).iter().all(|b| b.relative_x == 0.0 && b.relative_y == 0.0));
    }

    #[test]
    fn test_degenerate_and_nan_boxes() {
        let flat = BoundingBox::new(5.0, 5.0, 0.0, 10.0);
        let broken = BoundingBox::new(f64::NAN, 10.0, 0.0, 10.0);
        let line = fixtures::Line::new(0.0, 1000.0);
        let out = RemoveOverlaps
            .apply(&line.info(0, 1), vec![with_boxes(vec![flat, broken])])
            .unwrap();
        let boxes = boxes_of(&out[0]);
        assert!(boxes[0].right > boxes[0].left);
        assert_eq!(boxes[1].relative_y, 0.0);
    }
}
