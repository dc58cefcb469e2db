//! Measure walk
//!
//! Both validation and layout visit a measure the same way: each voice is
//! walked in division order, and the staff elements of the staves it touches
//! are interleaved as the voice reaches their division. Staves no voice
//! touches are walked on their own afterwards.

use super::cursor::{Cursor, LineContext, MeasureContext, NextHint, StaffContext};
use super::layout::{align, Layout, MeasureLayout, PerStaff};
use super::patch::{apply_to_measure, Operation};
use super::registry::ModelRegistry;
use super::snapshot::PartAttributes;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{Measure, Model, ModelData, ModelKind, PrintData, ScoreHeader, SegmentRef};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    Validate,
    Layout,
}

/// Everything a walk reads besides the measure itself
pub struct MeasureEnv<'a> {
    pub header: &'a ScoreHeader,
    pub registry: &'a dyn ModelRegistry,
    pub config: &'a EngineConfig,
    /// Part ids in header order
    pub parts: &'a [String],
    pub context: MeasureContext,
    pub line: LineContext,
    /// Snapshots in effect before the measure
    pub start: &'a PartAttributes,
    /// Print in effect before the measure
    pub print: Option<&'a PrintData>,
    pub approximate: bool,
}

/// A voice ran past the bar capacity of its staff
#[derive(Debug, Clone, PartialEq)]
pub struct Overflow {
    pub part: String,
    pub voice: usize,
    pub division: u32,
    pub capacity: u32,
}

#[derive(Debug, Default)]
pub struct Walk {
    /// First request that needs a restart, with the segment it came from.
    /// The walk stops as soon as one is raised.
    pub requests: Option<(SegmentRef, Vec<Operation>)>,
    /// Field edits already made to the measure during the walk
    pub settled: Vec<(SegmentRef, Vec<Operation>)>,
    pub overflow: Option<Overflow>,
    pub end_attributes: PartAttributes,
    pub print: Option<PrintData>,
    /// Bar capacity of each part's first staff
    pub capacities: BTreeMap<String, u32>,
    pub max_x: f64,
    pub max_divisions: u32,
    pub padding_top: PerStaff<f64>,
    pub padding_bottom: PerStaff<f64>,
    staff_layouts: BTreeMap<(usize, usize), Vec<Layout>>,
    voice_layouts: Vec<Vec<Layout>>,
}

pub fn validate_measure(env: &MeasureEnv, measure: &mut Measure) -> Result<Walk> {
    walk(env, measure, WalkMode::Validate)
}

/// Lay a validated measure out starting at x = 0. `pad_end` adds the end of
/// measure padding used when another measure follows on the line.
pub fn layout_measure(env: &MeasureEnv, measure: &mut Measure, pad_end: bool) -> Result<MeasureLayout> {
    let mut walk = walk(env, measure, WalkMode::Layout)?;
    let staff_lists = std::mem::take(&mut walk.staff_layouts).into_values().collect();
    let voice_lists = std::mem::take(&mut walk.voice_layouts);

    let mut width = walk.max_x;
    if pad_end && walk.max_x > 0.0 {
        width += env.config.measure_end_padding;
    }

    Ok(MeasureLayout {
        uuid: measure.uuid,
        number: measure.number.clone(),
        version: measure.version,
        attributes: env.start.clone(),
        end_attributes: walk.end_attributes,
        print: walk.print,
        elements: align(staff_lists, voice_lists),
        width,
        max_divisions: walk.max_divisions,
        origin_x: 0.0,
        origin_y: PerStaff::new(),
        padding_top: walk.padding_top,
        padding_bottom: walk.padding_bottom,
    })
}

pub fn walk(env: &MeasureEnv, measure: &mut Measure, mode: WalkMode) -> Result<Walk> {
    let mut walker = Walker {
        env,
        measure,
        mode,
        walk: Walk::default(),
    };

    for (order, part) in env.parts.iter().enumerate() {
        let Some(entry) = walker.measure.parts.get(part) else {
            continue;
        };
        let voices: Vec<(usize, BTreeSet<usize>)> = entry
            .voices
            .iter()
            .map(|(owner, segment)| (*owner, segment.models.iter().map(|m| m.staff_idx).collect()))
            .collect();
        let staves: Vec<usize> = entry.staves.keys().copied().collect();

        let mut visited = BTreeSet::new();
        for (voice, touched) in voices {
            walker.pass(order, part, Some(voice), &touched)?;
            if walker.walk.requests.is_some() {
                return Ok(walker.walk);
            }
            visited.extend(touched);
        }
        for staff in staves.into_iter().filter(|s| !visited.contains(s)) {
            walker.pass(order, part, None, &BTreeSet::from([staff]))?;
            if walker.walk.requests.is_some() {
                return Ok(walker.walk);
            }
        }
    }
    Ok(walker.walk)
}

fn hint_for(model: &Model) -> NextHint {
    NextHint {
        kind: model.effective_kind(),
        has_accidental: model.as_chord().map(|c| c.has_accidental()).unwrap_or(false),
    }
}

struct Walker<'e, 'a, 'm> {
    env: &'e MeasureEnv<'a>,
    measure: &'m mut Measure,
    mode: WalkMode,
    walk: Walk,
}

/// Position of the walk inside one staff segment: next index and its division
type StaffProgress = BTreeMap<usize, (usize, u32)>;

impl<'e, 'a, 'm> Walker<'e, 'a, 'm> {
    fn models(&self, at: &SegmentRef) -> Result<&Vec<Model>> {
        self.measure
            .segment(at)
            .map(|s| &s.models)
            .ok_or_else(|| EngineError::Invariant(format!("segment {} vanished during walk", at)))
    }

    fn start_context(&self, part: &str, staff: usize) -> StaffContext {
        let snapshot = self
            .env
            .start
            .get(part)
            .and_then(|p| p.get(&staff))
            .cloned()
            .unwrap_or_default();
        StaffContext::new(staff, snapshot)
    }

    /// Location of a proxy target in the first staff of `part`
    fn find_target(&self, part: &str, target: Uuid) -> Result<(SegmentRef, usize)> {
        let at = SegmentRef::staff(part, 1);
        self.measure
            .segment(&at)
            .and_then(|s| s.models.iter().position(|m| m.key == target))
            .map(|idx| (at, idx))
            .ok_or(EngineError::ProxyTargetMissing(target))
    }

    fn visit(&mut self, cursor: &mut Cursor, at: &SegmentRef, idx: usize) -> Result<Option<Layout>> {
        let (key, target) = {
            let model = &self.models(at)?[idx];
            let target = match &model.data {
                ModelData::Proxy(proxy) => Some(proxy.target),
                _ => None,
            };
            (model.key, target)
        };
        let (at, idx) = match target {
            Some(target) => self.find_target(&at.part, target)?,
            None => (at.clone(), idx),
        };

        match self.mode {
            WalkMode::Validate => {
                // edits raised through a proxy address its target
                let origin = (std::mem::replace(&mut cursor.segment, at.clone()), cursor.idx);
                cursor.idx = idx;
                let result = self.models(&at)?[idx].validate(cursor);
                (cursor.segment, cursor.idx) = origin;
                result.map(|_| None)
            }
            WalkMode::Layout => {
                let mut layout = self.models(&at)?[idx].layout(cursor)?;
                layout.key = Some(key);
                Ok(Some(layout))
            }
        }
    }

    /// Visit with the context of `staff` swapped into the cursor
    fn visit_on(
        &mut self,
        cursor: &mut Cursor,
        contexts: &mut BTreeMap<usize, StaffContext>,
        staff: usize,
        at: &SegmentRef,
        idx: usize,
    ) -> Result<Option<Layout>> {
        cursor.staff = contexts
            .remove(&staff)
            .unwrap_or_else(|| self.start_context(&at.part, staff));
        let result = self.visit(cursor, at, idx);
        contexts.insert(staff, std::mem::take(&mut cursor.staff));
        result
    }

    /// Take the cursor's requests. Field edits are made to the measure at once
    /// and the walk goes on; anything else stops it.
    fn stop_for_requests(&mut self, cursor: &mut Cursor) -> Result<bool> {
        if !cursor.has_requests() {
            return Ok(false);
        }
        let operations = cursor.take_requests();
        if operations.iter().any(Operation::restart_required) {
            self.walk.requests = Some((cursor.segment.clone(), operations));
            return Ok(true);
        }
        for op in &operations {
            apply_to_measure(self.measure, op)?;
        }
        self.walk.settled.push((cursor.segment.clone(), operations));
        Ok(false)
    }

    /// Walk `staff` up to `until` (everything when `None`). A barline at
    /// exactly `until` waits for the voice. Returns false if an element
    /// raised a patch request.
    fn advance_staff(
        &mut self,
        cursor: &mut Cursor,
        contexts: &mut BTreeMap<usize, StaffContext>,
        progress: &mut StaffProgress,
        out: &mut BTreeMap<usize, Vec<Layout>>,
        part: &str,
        staff: usize,
        until: Option<u32>,
        pending: Option<NextHint>,
    ) -> Result<bool> {
        let at = SegmentRef::staff(part, staff);
        loop {
            let (idx, division) = *progress.entry(staff).or_insert((0, 0));
            let Some(segment) = self.measure.segment(&at) else {
                return Ok(true);
            };
            let Some(model) = segment.models.get(idx) else {
                return Ok(true);
            };
            if let Some(until) = until {
                if division > until
                    || (division == until && model.effective_kind() == ModelKind::Barline)
                {
                    return Ok(true);
                }
            }
            let div_count = model.div_count;
            cursor.divisions = segment.divisions;
            let following = segment.models.get(idx + 1);
            cursor.next = following
                .filter(|n| n.div_count == 0 || pending.is_none())
                .map(hint_for)
                .or(pending);
            cursor.segment = at.clone();
            cursor.idx = idx;
            cursor.division = division;

            let layout = self.visit_on(cursor, contexts, staff, &at, idx)?;
            if self.stop_for_requests(cursor)? {
                return Ok(false);
            }
            out.entry(staff).or_default().extend(layout);
            progress.insert(staff, (idx + 1, division + div_count));
        }
    }

    /// One walk over `voice` (or over the staves alone when `None`),
    /// flushing `staves` at the end
    fn pass(
        &mut self,
        order: usize,
        part: &str,
        voice: Option<usize>,
        staves: &BTreeSet<usize>,
    ) -> Result<()> {
        let env = self.env;
        let mut cursor = Cursor::new(
            env.header,
            env.registry,
            env.config,
            SegmentRef::staff(part, 1),
            env.context.clone(),
            env.line.clone(),
            0.0,
        );
        cursor.print = env.print.cloned();
        cursor.approximate = env.approximate;

        let mut contexts: BTreeMap<usize, StaffContext> = staves
            .iter()
            .map(|s| (*s, self.start_context(part, *s)))
            .collect();
        let mut progress = StaffProgress::new();
        let mut staff_out: BTreeMap<usize, Vec<Layout>> = BTreeMap::new();
        let mut voice_out = Vec::new();

        if let Some(voice) = voice {
            let at = SegmentRef::voice(part, voice);
            let len = self.models(&at)?.len();
            let mut division = 0;
            for idx in 0..len {
                let (staff, div_count, pending, next) = {
                    let models = self.models(&at)?;
                    let model = &models[idx];
                    (
                        model.staff_idx,
                        model.div_count,
                        hint_for(model),
                        models.get(idx + 1).map(hint_for),
                    )
                };
                let advanced = self.advance_staff(
                    &mut cursor,
                    &mut contexts,
                    &mut progress,
                    &mut staff_out,
                    part,
                    staff,
                    Some(division),
                    Some(pending),
                )?;
                if !advanced {
                    return Ok(());
                }

                cursor.segment = at.clone();
                cursor.idx = idx;
                cursor.division = division;
                cursor.next = next;
                let layout = self.visit_on(&mut cursor, &mut contexts, staff, &at, idx)?;
                if self.stop_for_requests(&mut cursor)? {
                    return Ok(());
                }
                voice_out.extend(layout);

                division += div_count;
                self.walk.max_divisions = self.walk.max_divisions.max(division);
                let capacity = contexts.get(&staff).and_then(|c| c.total_divisions);
                if let Some(capacity) = capacity {
                    if division > capacity && self.walk.overflow.is_none() {
                        self.walk.overflow = Some(Overflow {
                            part: part.to_string(),
                            voice,
                            division,
                            capacity,
                        });
                    }
                }
            }
        }

        for staff in staves {
            let advanced = self.advance_staff(
                &mut cursor,
                &mut contexts,
                &mut progress,
                &mut staff_out,
                part,
                *staff,
                None,
                None,
            )?;
            if !advanced {
                return Ok(());
            }
        }

        self.finish_pass(order, part, cursor, contexts, staff_out, voice.map(|_| voice_out));
        Ok(())
    }

    fn finish_pass(
        &mut self,
        order: usize,
        part: &str,
        mut cursor: Cursor,
        contexts: BTreeMap<usize, StaffContext>,
        staff_out: BTreeMap<usize, Vec<Layout>>,
        voice_out: Option<Vec<Layout>>,
    ) {
        let walk = &mut self.walk;
        walk.max_x = walk.max_x.max(cursor.x);
        if let Some(print) = cursor.print.take() {
            walk.print = Some(print);
        }

        for (staff, context) in contexts {
            if let Some(capacity) = context.total_divisions {
                let first = walk.capacities.entry(part.to_string()).or_insert(capacity);
                if staff == 1 {
                    *first = capacity;
                }
            }
            walk.end_attributes
                .entry(part.to_string())
                .or_default()
                .insert(staff, context.attributes);
        }

        for (staff, top) in &cursor.max_padding_top {
            let slot = walk.padding_top.entry(part.to_string()).or_default().entry(*staff).or_insert(0.0);
            *slot = slot.max(*top);
        }
        for (staff, bottom) in &cursor.max_padding_bottom {
            let slot = walk
                .padding_bottom
                .entry(part.to_string())
                .or_default()
                .entry(*staff)
                .or_insert(0.0);
            *slot = slot.max(*bottom);
        }

        if self.mode == WalkMode::Layout {
            for (staff, list) in staff_out {
                match walk.staff_layouts.get_mut(&(order, staff)) {
                    // A staff visited by several voices keeps the widest placement
                    Some(existing) if existing.len() == list.len() => {
                        for (kept, seen) in existing.iter_mut().zip(list) {
                            kept.x = kept.x.max(seen.x);
                        }
                    }
                    Some(_) => {}
                    None => {
                        walk.staff_layouts.insert((order, staff), list);
                    }
                }
            }
            if let Some(list) = voice_out {
                walk.voice_layouts.push(list);
            }
        }
    }
}
