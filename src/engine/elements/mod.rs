//! Per-kind validation and layout behavior
//!
//! Every element answers `validate` (repair itself or request patches through
//! the cursor) and `layout` (produce a [`Layout`] and advance the cursor).
//! Proxies are resolved by the measure walk before either is called.

pub mod attributes;
pub mod barline;
pub mod chord;

use super::cursor::Cursor;
use super::layout::{BoundingBox, Layout, LayoutDetail};
use super::patch;
use crate::error::{EngineError, Result};
use crate::models::{Model, ModelData, ModelKind};

/// Height of one line of direction or chord-symbol text
const TEXT_HEIGHT: f64 = 14.0;
const TEXT_CHAR_WIDTH: f64 = 7.0;
/// Default distance of text above the top staff line
const ABOVE_STAFF_Y: f64 = 60.0;
const BELOW_STAFF_Y: f64 = -50.0;

impl Model {
    pub fn validate(&self, cursor: &mut Cursor) -> Result<()> {
        match &self.data {
            ModelData::Attributes(data) => attributes::validate(data, cursor),
            ModelData::Barline(_) => barline::validate(cursor),
            ModelData::Chord(data) => chord::validate(data, self.div_count, cursor),
            ModelData::Print(data) => {
                let mut inherited = data.clone();
                if let Some(previous) = &cursor.print {
                    if inherited.inherit(previous) {
                        let edits =
                            patch::set_fields(cursor.measure.uuid, &cursor.segment, cursor.idx, data, &inherited)?;
                        cursor.fixup(edits);
                    }
                }
                cursor.print = Some(inherited);
                Ok(())
            }
            ModelData::Proxy(proxy) => Err(EngineError::Invariant(format!(
                "proxy to {} reached validation unresolved",
                proxy.target
            ))),
            ModelData::Direction(_)
            | ModelData::Sound(_)
            | ModelData::Grouping(_)
            | ModelData::Harmony(_)
            | ModelData::FiguredBass(_)
            | ModelData::Spacer(_)
            | ModelData::VisualCursor(_) => Ok(()),
        }
    }

    pub fn layout(&self, cursor: &mut Cursor) -> Result<Layout> {
        let mut layout = match &self.data {
            ModelData::Attributes(data) => attributes::layout(data, cursor)?,
            ModelData::Barline(data) => barline::layout(data, cursor)?,
            ModelData::Chord(data) => chord::layout(data, self.div_count, cursor)?,
            ModelData::Print(data) => {
                cursor.print = Some(data.clone());
                let mut layout = zero_width(self.kind(), cursor);
                layout.detail = LayoutDetail::Print(data.clone());
                layout
            }
            ModelData::Direction(data) => {
                let mut layout = zero_width(ModelKind::Direction, cursor);
                let default_y = data
                    .default_y
                    .unwrap_or(if data.below { BELOW_STAFF_Y } else { ABOVE_STAFF_Y });
                for (line, words) in data.words.iter().enumerate() {
                    let width = words.chars().count() as f64 * TEXT_CHAR_WIDTH;
                    let y = default_y - line as f64 * TEXT_HEIGHT;
                    layout
                        .bounding_boxes
                        .push(BoundingBox::new(0.0, width, 0.0, TEXT_HEIGHT).at(0.0, y));
                }
                layout
            }
            ModelData::Harmony(data) => {
                let mut layout = zero_width(ModelKind::Harmony, cursor);
                let label = data.root.chars().count() + data.kind.chars().count();
                if label > 0 {
                    let width = label as f64 * TEXT_CHAR_WIDTH;
                    layout
                        .bounding_boxes
                        .push(BoundingBox::new(0.0, width, 0.0, TEXT_HEIGHT).at(0.0, ABOVE_STAFF_Y));
                }
                layout
            }
            ModelData::Proxy(proxy) => {
                return Err(EngineError::Invariant(format!(
                    "proxy to {} reached layout unresolved",
                    proxy.target
                )))
            }
            ModelData::Sound(_)
            | ModelData::Grouping(_)
            | ModelData::FiguredBass(_)
            | ModelData::Spacer(_)
            | ModelData::VisualCursor(_) => zero_width(self.kind(), cursor),
        };
        layout.key = Some(self.key);
        if self.div_count > 0 {
            layout.div_count = Some(self.div_count);
        }
        Ok(layout)
    }
}

fn zero_width(kind: ModelKind, cursor: &Cursor) -> Layout {
    Layout::new(kind, cursor.part(), cursor.staff.idx, cursor.x, cursor.division)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::cursor::{LineContext, MeasureContext, StaffContext};
    use crate::engine::patch::{apply_to_measure, Operation};
    use crate::engine::registry::StandardRegistry;
    use crate::engine::snapshot::AttributesSnapshot;
    use crate::models::{
        AttributesData, BarStyle, BarlineData, ChordData, DirectionData, Note, ScoreHeader,
        SegmentRef, Step, Time,
    };

    fn cursor<'a>(header: &'a ScoreHeader, config: &'a EngineConfig) -> Cursor<'a> {
        Cursor::new(
            header,
            &StandardRegistry,
            config,
            SegmentRef::staff("P1", 1),
            MeasureContext::default(),
            LineContext::default(),
            0.0,
        )
    }

    #[test]
    fn test_attributes_validate_requests_default_fields() {
        let header = ScoreHeader::default();
        let config = EngineConfig::default();
        let mut measure = crate::models::Measure::new("1");
        measure.insert_segment(
            crate::models::Segment::new("P1", crate::models::OwnerType::Staff, 1, 1)
                .with_models(vec![Model::new(ModelData::Attributes(AttributesData::default()))]),
        );
        let mut c = cursor(&header, &config);
        c.measure.uuid = measure.uuid;
        c.staff = StaffContext { idx: 1, ..Default::default() };

        let at = SegmentRef::staff("P1", 1);
        measure.segment(&at).unwrap().models[0].validate(&mut c).unwrap();
        assert_eq!(c.staff.total_divisions, Some(4));

        let edits = c.take_requests();
        let mut fields: Vec<&str> = edits
            .iter()
            .map(|op| match op {
                Operation::SetField { field, .. } => field.as_str(),
                other => panic!("unexpected operation {:?}", other),
            })
            .collect();
        fields.sort_unstable();
        assert_eq!(
            fields,
            vec!["clefs", "divisions", "keySignatures", "staffDetails", "staves", "times"]
        );
        assert!(edits.iter().all(|op| !op.restart_required()));

        for op in &edits {
            apply_to_measure(&mut measure, op).unwrap();
        }
        let data = measure.segment(&at).unwrap().models[0].as_attributes().unwrap().clone();
        assert_eq!(data.divisions, Some(1));
        assert_eq!(data.times, vec![Time::common()]);
        assert_eq!(data.staff_details[0].staff_lines, Some(5));

        // the repaired element needs nothing more
        c.staff.attributes = AttributesSnapshot::default();
        measure.segment(&at).unwrap().models[0].validate(&mut c).unwrap();
        assert!(!c.has_requests());
    }

    #[test]
    fn test_empty_attributes_render_no_width() {
        let header = ScoreHeader::default();
        let config = EngineConfig::default();
        let mut c = cursor(&header, &config);
        c.line.bar_on_line = 1;
        c.division = 2;
        let layout = Model::new(ModelData::Attributes(AttributesData::default()))
            .layout(&mut c)
            .unwrap();
        assert_eq!(layout.rendered_width, Some(0.0));
        assert_eq!(c.x, 0.0);
    }

    #[test]
    fn test_barline_requests_spacer_for_missing_divisions() {
        let header = ScoreHeader::default();
        let config = EngineConfig::default();
        let mut c = cursor(&header, &config);
        c.staff.total_divisions = Some(8);
        c.division = 3;
        c.idx = 2;

        let barline = Model::new(ModelData::Barline(BarlineData::default()));
        barline.validate(&mut c).unwrap();
        let requests = c.take_requests();
        assert_eq!(requests.len(), 1);
        match &requests[0] {
            Operation::InsertModel { index, model, .. } => {
                assert_eq!(*index, 2);
                assert_eq!(model.kind(), ModelKind::Spacer);
                assert_eq!(model.div_count, 5);
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_final_barline_is_light_heavy() {
        let header = ScoreHeader::default();
        let config = EngineConfig::default();
        let mut c = cursor(&header, &config);
        let layout = Model::new(ModelData::Barline(BarlineData::default()))
            .layout(&mut c)
            .unwrap();
        match layout.detail {
            LayoutDetail::Barline { bar_style, ref line_offsets } => {
                assert_eq!(bar_style, BarStyle::LightHeavy);
                assert_eq!(line_offsets.len(), 2);
            }
            ref other => panic!("unexpected detail {:?}", other),
        }
        assert!(c.x > 0.0);
        assert_eq!(layout.rendered_width, Some(c.x));
    }

    #[test]
    fn test_chord_layout_advances_cursor_and_pads_staff() {
        let header = ScoreHeader::default();
        let config = EngineConfig::default();
        let mut c = cursor(&header, &config);
        c.staff = StaffContext::new(
            1,
            crate::engine::snapshot::create(
                &AttributesSnapshot::default(),
                &AttributesData {
                    divisions: Some(1),
                    clefs: vec![crate::models::Clef::treble(1)],
                    times: vec![Time::common()],
                    ..Default::default()
                },
                1,
                0,
            ),
        );
        // A6 sits well above the staff
        let chord = Model::new(ModelData::Chord(ChordData {
            notes: vec![Note::pitched(Step::A, 6)],
            grace: false,
        }))
        .with_div_count(1);
        let layout = chord.layout(&mut c).unwrap();
        assert_eq!(layout.x, 0.0);
        assert!((c.x - 22.8).abs() < 1e-9);
        assert!(c.max_padding_top[&1] > 0.0);
        assert_eq!(layout.key, Some(chord.key));
    }

    #[test]
    fn test_direction_produces_movable_boxes() {
        let header = ScoreHeader::default();
        let config = EngineConfig::default();
        let mut c = cursor(&header, &config);
        let direction = Model::new(ModelData::Direction(DirectionData {
            words: vec!["dolce".into()],
            below: false,
            default_y: None,
        }));
        let layout = direction.layout(&mut c).unwrap();
        assert_eq!(layout.bounding_boxes.len(), 1);
        assert!(!layout.bounding_boxes[0].fixed);
        assert_eq!(c.x, 0.0);
    }
}
