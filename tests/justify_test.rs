//! Justification tests
//!
//! Two measures with interleaved voice rhythms, justified on the final line
//! and on a full line of a 1000-wide page with 12 tenths of margin. The same
//! rhythms are then run through `Engine::layout_song` with lyrics wide enough
//! for padding to matter.

use score_engine::config::{EngineConfig, LayoutOptions};
use score_engine::engine::layout::{align, ExpandPolicy, Layout, MeasureLayout, PerStaff};
use score_engine::engine::line::LinePosition;
use score_engine::engine::line_bounds::LineBounds;
use score_engine::engine::snapshot::{AttributesSnapshot, PartAttributes};
use score_engine::engine::{Engine, EngineContext};
use score_engine::models::{
    ChordData, Document, Lyric, Measure, Model, ModelData, ModelKind, Note, OddEvenBoth, OwnerType,
    PageLayout, PageMargins, PartInfo, PrintData, ScoreHeader, Segment, Step, SystemLayout, Time,
};
use score_engine::postprocess::{Justify, LineInfo, Pad, Pipeline, Postprocessor};
use uuid::Uuid;

const PADDING: f64 = 12.0;

fn layout(kind: ModelKind, division: u32, x: f64, div_count: Option<u32>) -> Layout {
    let mut layout = Layout::new(kind, "P1", 1, x, division);
    layout.key = Some(Uuid::new_v4());
    layout.div_count = div_count;
    if kind == ModelKind::Chord {
        layout.expand_policy = ExpandPolicy::After;
    }
    layout
}

/// Two chords; each advances 10 per division after a 10 wide header
fn voice(first: u32, second: u32) -> Vec<Layout> {
    vec![
        layout(ModelKind::Chord, 0, 10.0, Some(first)),
        layout(ModelKind::Chord, first, 10.0 + f64::from(first) * 10.0, Some(second)),
    ]
}

fn common_time() -> PartAttributes {
    let snapshot = AttributesSnapshot {
        divisions: Some(4),
        time: Some(Time::common()),
        ..Default::default()
    };
    PartAttributes::from([("P1".to_string(), [(1, snapshot)].into_iter().collect())])
}

fn measure(voices: Vec<Vec<Layout>>) -> MeasureLayout {
    let staff = vec![
        layout(ModelKind::Attributes, 0, 0.0, None),
        layout(ModelKind::Attributes, 4, 90.0, None),
    ];
    MeasureLayout {
        uuid: Uuid::new_v4(),
        number: "1".into(),
        version: 0,
        attributes: common_time(),
        end_attributes: common_time(),
        print: None,
        elements: align(vec![staff], voices),
        width: 100.0,
        max_divisions: 8,
        origin_x: 0.0,
        origin_y: PerStaff::new(),
        padding_top: PerStaff::new(),
        padding_bottom: PerStaff::new(),
    }
}

fn song() -> Vec<MeasureLayout> {
    vec![
        measure(vec![voice(2, 6), voice(1, 7)]),
        measure(vec![voice(1, 7), voice(2, 6)]),
    ]
}

fn justify(line: usize, lines: usize, layouts: Vec<MeasureLayout>) -> Vec<MeasureLayout> {
    let options = LayoutOptions::default();
    let config = EngineConfig::default();
    let bounds = LineBounds {
        left: PADDING,
        right: 1000.0 - PADDING,
        top: 0.0,
        system_layout: SystemLayout::default(),
    };
    let parts = vec!["P1".to_string()];
    let info = LineInfo {
        options: &options,
        bounds: &bounds,
        config: &config,
        parts: &parts,
        position: LinePosition { line, lines },
    };
    Justify.apply(&info, layouts).unwrap()
}

#[test]
fn test_final_line_is_partially_justified() {
    let layouts = song();
    let justified = justify(0, 1, layouts.clone());

    let first = &justified[0];
    assert!((first.elements[0][0].x - layouts[0].elements[0][0].x).abs() < 0.05);
    assert!((first.elements[0][2].x - 24.16).abs() < 0.1);
    let expected_width = first.elements[0][4].x - first.elements[0][0].x + 10.0;
    assert!((first.width - expected_width).abs() < 0.01);
    for (after, before) in justified.iter().zip(&layouts) {
        assert_ne!(after.width, before.width);
    }
    assert!((justified[1].origin_x - (first.width - 100.0)).abs() < 1e-9);
}

#[test]
fn test_full_line_reaches_right_margin() {
    let justified = justify(0, 2, song());
    let width: f64 = justified.iter().map(|m| m.width).sum();
    assert!((width - (1000.0 - 2.0 * PADDING)).abs() < 0.01);
}

#[test]
fn test_final_line_expands_less_per_weight_than_full_line() {
    let full = justify(0, 2, song());
    let last = justify(1, 2, song());
    let grown = |layouts: &[MeasureLayout]| layouts.iter().map(|m| m.width - 100.0).sum::<f64>();
    assert!(grown(&last) > 0.0);
    assert!(grown(&last) < grown(&full));
}

#[test]
fn test_columns_stay_aligned() {
    for measure in justify(0, 2, song()) {
        for j in 0..measure.column_count() {
            let x = measure.elements[0][j].x;
            assert!(measure.elements.iter().all(|row| (row[j].x - x).abs() < 1e-9));
        }
    }
}

fn sung(div_count: u32, lyric: Option<&str>) -> Model {
    let mut note = Note::pitched(Step::G, 4);
    if let Some(text) = lyric {
        note.lyrics.push(Lyric {
            text: text.into(),
            number: Some(1),
        });
    }
    Model::new(ModelData::Chord(ChordData {
        notes: vec![note],
        grace: false,
    }))
    .with_div_count(div_count)
}

fn page() -> Model {
    let margins = PageMargins {
        kind: OddEvenBoth::Both,
        left: PADDING,
        right: PADDING,
        top: 10.0,
        bottom: 10.0,
    };
    Model::new(ModelData::Print(PrintData {
        page_layout: Some(PageLayout {
            page_width: 1000.0,
            page_height: 1500.0,
            page_margins: vec![margins],
        }),
        ..Default::default()
    }))
}

/// Voice 1 holds halves, voice 2 a quarter and a dotted half; the order
/// flips in odd measures
fn bar(number: usize) -> Measure {
    let (upper, lower) = if number % 2 == 1 { ((2, 2), (1, 3)) } else { ((1, 3), (2, 2)) };
    let staff = if number == 1 { vec![page()] } else { vec![] };
    let mut m = Measure::new(&number.to_string());
    m.insert_segment(Segment::new("P1", OwnerType::Staff, 1, 1).with_models(staff));
    m.insert_segment(
        Segment::new("P1", OwnerType::Voice, 1, 1)
            .with_models(vec![sung(upper.0, Some("Hallelujah")), sung(upper.1, None)]),
    );
    m.insert_segment(
        Segment::new("P1", OwnerType::Voice, 2, 1).with_models(vec![sung(lower.0, None), sung(lower.1, None)]),
    );
    m
}

fn sung_song(bars: usize) -> Document {
    Document {
        header: ScoreHeader {
            part_list: vec![PartInfo {
                id: "P1".into(),
                name: "Voice".into(),
            }],
            ..Default::default()
        },
        measures: (1..=bars).map(bar).collect(),
    }
}

fn lay_out(ctx: &mut EngineContext, bars: usize) -> Vec<Vec<MeasureLayout>> {
    Engine::layout_song(ctx, &mut sung_song(bars), &LayoutOptions::default()).unwrap()
}

#[test]
fn test_song_final_line_is_partially_justified() {
    let padded = lay_out(&mut EngineContext::default().with_pipeline(Pipeline::empty().with_stage(Pad)), 2);
    let justified = lay_out(&mut EngineContext::default(), 2);
    assert_eq!(justified.len(), 1);
    assert_eq!(justified[0].len(), 2);

    let line = &justified[0];
    assert_eq!(line[0].origin_x, PADDING);
    assert!((line[1].origin_x - (line[0].origin_x + line[0].width)).abs() < 1e-6);
    let width: f64 = line.iter().map(|m| m.width).sum();
    assert!(width < 1000.0 - 2.0 * PADDING - 1.0);

    for (after, before) in line.iter().zip(&padded[0]) {
        assert!(after.width > before.width);
        assert!((after.elements[0][0].x - before.elements[0][0].x).abs() < 1e-9);
        for j in 0..after.column_count() {
            let x = after.elements[0][j].x;
            assert!(after.elements.iter().all(|row| (row[j].x - x).abs() < 1e-9));
        }
    }
}

#[test]
fn test_padded_song_lines_still_reach_right_margin() {
    let lines = lay_out(&mut EngineContext::default(), 24);
    assert!(lines.len() > 1);
    let (_, full) = lines.split_last().unwrap();
    for line in full {
        let width: f64 = line.iter().map(|m| m.width).sum();
        assert!((width - (1000.0 - 2.0 * PADDING)).abs() < 0.01);
    }
}
