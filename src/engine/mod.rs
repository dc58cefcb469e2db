//! Validation and layout engine
//!
//! `Engine::validate` repairs and normalizes a document measure by measure.
//! `Engine::layout_song` validates, breaks the song into lines, lays each
//! line out and runs the postprocessing pipeline over it. Outside preview, a
//! measure's version is bumped whenever its finished layout changes.

pub mod cache;
pub mod cursor;
pub mod elements;
pub mod layout;
pub mod line;
pub mod line_bounds;
pub mod line_breaker;
pub mod measure;
pub mod overflow;
pub mod patch;
pub mod registry;
pub mod snapshot;
pub mod validate;

use crate::config::{EngineConfig, LayoutOptions};
use crate::error::{EngineError, Result};
use crate::models::Document;
use crate::postprocess::{LineInfo, Pipeline};
use cache::LayoutCache;
use layout::MeasureLayout;
use line::{layout_line, LinePosition};
use line_bounds::LineBounds;
use line_breaker::{break_lines, placement_hints, PlacementHint};
use patch::{ApplyInPlace, Fixup};
use registry::{ModelRegistry, StandardRegistry};
use validate::{validate_document, ValidationReport};

/// Everything the engine keeps between calls
pub struct EngineContext {
    pub registry: Box<dyn ModelRegistry>,
    pub fixup: Box<dyn Fixup>,
    pub cache: LayoutCache,
    pub pipeline: Pipeline,
    pub config: EngineConfig,
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(Box::new(StandardRegistry), Box::new(ApplyInPlace))
    }
}

impl EngineContext {
    pub fn new(registry: Box<dyn ModelRegistry>, fixup: Box<dyn Fixup>) -> Self {
        Self {
            registry,
            fixup,
            cache: LayoutCache::new(),
            pipeline: Pipeline::default(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }
}

pub struct Engine;

impl Engine {
    /// Validate and commit every measure of `doc`
    pub fn validate(ctx: &mut EngineContext, doc: &mut Document) -> Result<ValidationReport> {
        validate_document(ctx, doc, true)
    }

    /// Lay out the whole song. Returns one list of measure layouts per line.
    pub fn layout_song(
        ctx: &mut EngineContext,
        doc: &mut Document,
        options: &LayoutOptions,
    ) -> Result<Vec<Vec<MeasureLayout>>> {
        let report = validate_document(ctx, doc, !options.preview)?;
        let states = report.measures;

        let print = options
            .print
            .clone()
            .or_else(|| doc.first_print().cloned())
            .ok_or(EngineError::MissingPrint)?;
        let page = options.page();
        let bounds = LineBounds::calculate(&print, page)?;

        let hints = if options.preview && hints_match(ctx.cache.hints(), &states) {
            ctx.cache.hints().to_vec()
        } else {
            let hints = placement_hints(ctx, doc, &states, options)?;
            if !options.preview {
                ctx.cache.set_hints(hints.clone());
            }
            hints
        };

        let plans = break_lines(&hints, &bounds, &ctx.config, options);
        let parts = doc.part_ids();
        let lines = plans.len();
        let mut y = bounds.top;
        let mut song = Vec::with_capacity(lines);

        for (line, plan) in plans.iter().enumerate() {
            let line_bounds = match (&options.print, &plan.print) {
                (None, Some(line_print)) => LineBounds::calculate(line_print, page)?,
                _ => bounds.clone(),
            };
            let position = LinePosition { line, lines };
            let raw = layout_line(ctx, doc, &states, plan, position, &line_bounds, options, &mut y)?;

            let info = LineInfo {
                options,
                bounds: &line_bounds,
                config: &ctx.config,
                parts: &parts,
                position,
            };
            let mut finished = ctx.pipeline.run(&info, &raw)?;
            for (layout, idx) in finished.iter_mut().zip(&plan.measures) {
                let measure = &mut doc.measures[*idx];
                if !options.preview && ctx.cache.publish(layout) {
                    measure.version += 1;
                }
                layout.version = measure.version;
            }
            song.push(finished);
        }

        log::info!("laid out {} measures on {} lines", states.len(), lines);
        Ok(song)
    }
}

fn hints_match(hints: &[PlacementHint], states: &[cache::MeasureState]) -> bool {
    hints.len() == states.len() && hints.iter().zip(states).all(|(h, s)| h.uuid == s.uuid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_needs_print() {
        let mut ctx = EngineContext::default();
        let mut doc = Document::default();
        assert!(matches!(
            Engine::layout_song(&mut ctx, &mut doc, &LayoutOptions::default()),
            Err(EngineError::MissingPrint)
        ));
    }

    #[test]
    fn test_hints_match_by_uuid() {
        assert!(hints_match(&[], &[]));
    }
}
