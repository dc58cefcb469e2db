//! Line postprocessing
//!
//! Once a line has been laid out, its measure layouts pass through an ordered
//! list of stages. Each stage receives its own copy of the layouts and
//! returns the rewritten copy; nothing a stage does reaches the cache.

pub mod center;
pub mod justify;
pub mod pad;
pub mod remove_overlaps;
pub mod vpsc;

pub use center::Center;
pub use justify::Justify;
pub use pad::Pad;
pub use remove_overlaps::RemoveOverlaps;

use crate::config::{EngineConfig, LayoutOptions};
use crate::engine::layout::MeasureLayout;
use crate::engine::line::LinePosition;
use crate::engine::line_bounds::LineBounds;
use crate::error::Result;

/// What a stage knows about the line it is rewriting
pub struct LineInfo<'a> {
    pub options: &'a LayoutOptions,
    pub bounds: &'a LineBounds,
    pub config: &'a EngineConfig,
    /// Part ids in header order
    pub parts: &'a [String],
    pub position: LinePosition,
}

impl LineInfo<'_> {
    pub fn is_last_line(&self) -> bool {
        self.position.line + 1 >= self.position.lines
    }
}

pub trait Postprocessor {
    fn name(&self) -> &'static str;

    fn apply(&self, line: &LineInfo, layouts: Vec<MeasureLayout>) -> Result<Vec<MeasureLayout>>;
}

/// Ordered list of stages
pub struct Pipeline {
    stages: Vec<Box<dyn Postprocessor>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::empty()
            .with_stage(Pad)
            .with_stage(Justify)
            .with_stage(Center)
            .with_stage(RemoveOverlaps)
    }
}

impl Pipeline {
    pub fn empty() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn with_stage(mut self, stage: impl Postprocessor + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, line: &LineInfo, layouts: &[MeasureLayout]) -> Result<Vec<MeasureLayout>> {
        let mut layouts = layouts.to_vec();
        for stage in &self.stages {
            layouts = stage.apply(line, layouts)?;
        }
        Ok(layouts)
    }
}

/// Row-major column access that tolerates ragged rows
pub(crate) fn column_len(layout: &MeasureLayout) -> usize {
    layout.elements.iter().map(Vec::len).max().unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::LineInfo;
    use crate::config::{EngineConfig, LayoutOptions};
    use crate::engine::layout::{align, ExpandPolicy, Layout, MeasureLayout, PerStaff};
    use crate::engine::line::LinePosition;
    use crate::engine::line_bounds::LineBounds;
    use crate::engine::snapshot::{AttributesSnapshot, PartAttributes};
    use crate::models::{ModelKind, Time};
    use uuid::Uuid;

    pub struct Line {
        pub options: LayoutOptions,
        pub bounds: LineBounds,
        pub config: EngineConfig,
        pub parts: Vec<String>,
    }

    impl Line {
        pub fn new(left: f64, right: f64) -> Self {
            Self {
                options: LayoutOptions::default(),
                bounds: LineBounds {
                    left,
                    right,
                    top: 0.0,
                    system_layout: Default::default(),
                },
                config: EngineConfig::default(),
                parts: vec!["P1".to_string()],
            }
        }

        pub fn info(&self, line: usize, lines: usize) -> LineInfo<'_> {
            LineInfo {
                options: &self.options,
                bounds: &self.bounds,
                config: &self.config,
                parts: &self.parts,
                position: LinePosition { line, lines },
            }
        }
    }

    pub fn element(kind: ModelKind, division: u32, x: f64, div_count: Option<u32>) -> Layout {
        let mut layout = Layout::new(kind, "P1", 1, x, division);
        layout.key = Some(Uuid::new_v4());
        layout.div_count = div_count;
        if kind == ModelKind::Chord {
            layout.expand_policy = ExpandPolicy::After;
        }
        layout
    }

    pub fn attributes(divisions: u32) -> PartAttributes {
        let snapshot = AttributesSnapshot {
            divisions: Some(divisions),
            time: Some(Time::common()),
            ..Default::default()
        };
        PartAttributes::from([("P1".to_string(), [(1, snapshot)].into_iter().collect())])
    }

    pub fn measure(voices: Vec<Vec<Layout>>, width: f64, max_divisions: u32) -> MeasureLayout {
        let staff = vec![
            element(ModelKind::Attributes, 0, 0.0, None),
            element(ModelKind::Attributes, 4, 90.0, None),
        ];
        MeasureLayout {
            uuid: Uuid::new_v4(),
            number: "1".into(),
            version: 0,
            attributes: attributes(4),
            end_attributes: attributes(4),
            print: None,
            elements: align(vec![staff], voices),
            width,
            max_divisions,
            origin_x: 0.0,
            origin_y: PerStaff::new(),
            padding_top: PerStaff::new(),
            padding_bottom: PerStaff::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pipeline_order() {
        assert_eq!(
            Pipeline::default().stage_names(),
            vec!["pad", "justify", "center", "remove_overlaps"]
        );
    }
}
