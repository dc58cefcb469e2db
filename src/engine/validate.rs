//! Validation pass
//!
//! Measures are validated in order. Each one gets its header repaired and is
//! then walked; patch requests restart that measure alone, while an overflow
//! splits it and restarts the whole pass. Clean measures hand their final
//! snapshots to the next measure.

use super::cache::{fingerprint, MeasureState};
use super::cursor::{LineContext, MeasureContext};
use super::measure::{validate_measure, MeasureEnv, Overflow};
use super::overflow::split_measure;
use super::patch::Operation;
use super::snapshot::PartAttributes;
use super::EngineContext;
use crate::error::{EngineError, Result};
use crate::models::{
    AttributesData, BarStyle, Document, Model, ModelData, ModelKind, PrintData, ProxyRef, SegmentRef,
};
use serde::Serialize;
use std::collections::BTreeSet;

/// Outcome of one validation attempt on one measure
#[derive(Debug)]
pub enum MeasureStep {
    Clean(MeasureState),
    /// Patches were applied; validate this measure again
    Restart(Vec<Operation>),
    /// The measure must be split; the whole pass runs again afterwards
    Overflow(Vec<Operation>),
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Operations applied, header repairs included
    pub patches: usize,
    pub restarts: usize,
    pub overflow_passes: usize,
    /// Measures reused from the cache
    pub skipped: usize,
    /// Measures whose committed content changed
    pub changed: usize,
    pub measures: Vec<MeasureState>,
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: u32, b: u32) -> u32 {
    if a == 0 || b == 0 {
        0
    } else {
        a / gcd(a, b) * b
    }
}

/// Rescale every segment to the least common multiple of all declared
/// divisions. Returns whether anything changed.
pub fn normalize_divisions(doc: &mut Document) -> bool {
    let target = doc
        .measures
        .iter()
        .flat_map(|m| m.segments())
        .map(|s| s.divisions)
        .filter(|d| *d > 0)
        .fold(1, lcm);

    let mut changed = false;
    for segment in doc.measures.iter_mut().flat_map(|m| m.segments_mut()) {
        if segment.divisions == target || segment.divisions == 0 {
            continue;
        }
        let factor = target / segment.divisions;
        for model in segment.models.iter_mut() {
            model.div_count *= factor;
            if let ModelData::Attributes(AttributesData {
                divisions: Some(divisions),
                ..
            }) = &mut model.data
            {
                *divisions *= factor;
            }
        }
        segment.divisions = target;
        changed = true;
    }
    changed
}

/// Index at which a zero-duration element of `kind` belongs in the leading
/// timestep of `models`
fn header_slot(models: &[Model], kind: ModelKind) -> usize {
    models
        .iter()
        .take_while(|m| m.div_count == 0 && m.effective_kind().priority() < kind.priority())
        .count()
}

/// Make sure every staff starts with a Print and an Attributes and ends with
/// a Barline. Secondary staves point at the first staff's header through
/// proxies. Returns the number of operations applied.
fn repair_header(ctx: &mut EngineContext, doc: &mut Document, idx: usize, parts: &[String]) -> Result<usize> {
    let last = idx + 1 == doc.measures.len();
    let uuid = doc.measures[idx].uuid;
    let mut applied = 0;

    for part in parts {
        let staves: Vec<usize> = doc.measures[idx]
            .parts
            .get(part)
            .map(|p| p.staves.keys().copied().collect())
            .unwrap_or_default();

        for staff in staves {
            let at = SegmentRef::staff(part, staff);
            for kind in [ModelKind::Print, ModelKind::Attributes] {
                let Some(op) = header_patch(ctx, doc, idx, &at, kind)? else {
                    continue;
                };
                ctx.fixup.fixup(doc, Some(&at), &[op], true)?;
                applied += 1;
            }

            let ends_with_barline = doc.measures[idx]
                .segment(&at)
                .and_then(|s| s.models.last())
                .map_or(false, |m| m.effective_kind() == ModelKind::Barline);
            if !ends_with_barline {
                let mut barline = ctx.registry.create(ModelKind::Barline)?.on_staff(staff);
                if let ModelData::Barline(data) = &mut barline.data {
                    data.bar_style = Some(if last { BarStyle::LightHeavy } else { BarStyle::Regular });
                }
                let index = doc.measures[idx].segment(&at).map_or(0, |s| s.models.len());
                let op = Operation::InsertModel {
                    measure: uuid,
                    segment: at.clone(),
                    index,
                    model: barline,
                };
                ctx.fixup.fixup(doc, Some(&at), &[op], true)?;
                applied += 1;
            }
        }
    }
    Ok(applied)
}

fn header_patch(
    ctx: &EngineContext,
    doc: &Document,
    idx: usize,
    at: &SegmentRef,
    kind: ModelKind,
) -> Result<Option<Operation>> {
    let measure = &doc.measures[idx];
    let Some(segment) = measure.segment(at) else {
        return Ok(None);
    };
    if !ctx.registry.search(&segment.models, 0, &[kind]).is_empty() {
        return Ok(None);
    }

    let primary = SegmentRef::staff(&at.part, 1);
    let target = if at.owner == 1 {
        None
    } else {
        measure.segment(&primary).and_then(|s| {
            ctx.registry
                .search(&s.models, 0, &[kind])
                .first()
                .map(|i| (*i, s.models[*i].key))
        })
    };

    let (index, model) = match target {
        Some((target_idx, key)) => (
            target_idx.min(segment.models.len()),
            Model::new(ModelData::Proxy(ProxyRef { target: key, kind })).on_staff(at.owner),
        ),
        None => (
            header_slot(&segment.models, kind),
            ctx.registry.create(kind)?.on_staff(at.owner),
        ),
    };
    log::debug!("measure {} {}: adding missing {}", measure.number, at, kind);
    Ok(Some(Operation::InsertModel {
        measure: measure.uuid,
        segment: at.clone(),
        index,
        model,
    }))
}

/// One attempt at validating measure `idx`
fn step(
    ctx: &mut EngineContext,
    doc: &mut Document,
    idx: usize,
    parts: &[String],
    start: &PartAttributes,
    print: Option<&PrintData>,
    report: &mut ValidationReport,
) -> Result<MeasureStep> {
    report.patches += repair_header(ctx, doc, idx, parts)?;

    let Document { header, measures } = &mut *doc;
    let is_last_in_document = idx + 1 == measures.len();
    let measure = &mut measures[idx];
    let env = MeasureEnv {
        header: &*header,
        registry: ctx.registry.as_ref(),
        config: &ctx.config,
        parts,
        context: MeasureContext {
            uuid: measure.uuid,
            idx,
            number: measure.number.clone(),
            implicit: measure.implicit,
            is_last_in_document,
        },
        line: LineContext::default(),
        start,
        print,
        approximate: false,
    };
    let walk = validate_measure(&env, measure)?;

    for (segment, operations) in &walk.settled {
        ctx.fixup.fixup(doc, Some(segment), operations, false)?;
        report.patches += operations.len();
    }
    if let Some((segment, operations)) = walk.requests {
        ctx.fixup.fixup(doc, Some(&segment), &operations, true)?;
        report.patches += operations.len();
        return Ok(MeasureStep::Restart(operations));
    }

    if let Some(overflow) = walk.overflow {
        guard_oversized(doc, idx, &overflow)?;
        let taken: BTreeSet<&str> = doc.measures.iter().map(|m| m.number.as_str()).collect();
        let operations = split_measure(&doc.measures[idx], idx, &walk.capacities, &taken);
        return Ok(MeasureStep::Overflow(operations));
    }

    Ok(MeasureStep::Clean(MeasureState {
        uuid: doc.measures[idx].uuid,
        start: start.clone(),
        end: walk.end_attributes,
        start_print: print.cloned(),
        end_print: walk.print,
    }))
}

/// A voice whose first element alone exceeds the bar could never be split
/// into fitting measures
fn guard_oversized(doc: &Document, idx: usize, overflow: &Overflow) -> Result<()> {
    let first = doc.measures[idx]
        .segment(&SegmentRef::voice(&overflow.part, overflow.voice))
        .and_then(|s| s.models.first())
        .map_or(0, |m| m.div_count);
    if first > overflow.capacity {
        return Err(EngineError::Invariant(format!(
            "measure {} voice {}: element of {} divisions exceeds bar capacity {}",
            doc.measures[idx].number, overflow.voice, first, overflow.capacity
        )));
    }
    Ok(())
}

/// Validate measure `idx` until it is clean or must be split
fn settle(
    ctx: &mut EngineContext,
    doc: &mut Document,
    idx: usize,
    parts: &[String],
    start: &PartAttributes,
    print: Option<&PrintData>,
    report: &mut ValidationReport,
) -> Result<MeasureStep> {
    let mut attempts = Vec::new();
    for _ in 0..ctx.config.max_measure_tries {
        match step(ctx, doc, idx, parts, start, print, report)? {
            MeasureStep::Restart(operations) => {
                log::debug!(
                    "measure {}: restarting validation after {} operation(s)",
                    doc.measures[idx].number,
                    operations.len()
                );
                report.restarts += 1;
                attempts.push(operations);
            }
            settled => return Ok(settled),
        }
    }

    let measure = &doc.measures[idx];
    log::error!(
        "measure {} still invalid after {} passes; attempted operations: {}",
        measure.number,
        attempts.len(),
        serde_json::to_string(&attempts).unwrap_or_default()
    );
    Err(EngineError::FixupLoop {
        measure: measure.uuid,
        tries: attempts.len(),
        operations: attempts,
    })
}

/// Validate the whole document.
///
/// With `commit`, clean measures are stored in the cache. Versions are left
/// to layout, which bumps them when a committed layout changes.
pub fn validate_document(ctx: &mut EngineContext, doc: &mut Document, commit: bool) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();

    'pass: loop {
        normalize_divisions(doc);
        report.measures.clear();
        let parts = doc.part_ids();
        let mut start = PartAttributes::new();
        let mut print: Option<PrintData> = None;

        let mut idx = 0;
        while idx < doc.measures.len() {
            let last = idx + 1 == doc.measures.len();
            let fp = fingerprint(&doc.measures[idx]);
            if let Some(state) = ctx.cache.fresh(&doc.measures[idx], fp, &start, print.as_ref(), last) {
                start = state.end.clone();
                print = state.end_print.clone();
                report.measures.push(state.clone());
                report.skipped += 1;
                idx += 1;
                continue;
            }

            match settle(ctx, doc, idx, &parts, &start, print.as_ref(), &mut report)? {
                MeasureStep::Clean(state) => {
                    if commit {
                        let measure = &doc.measures[idx];
                        let fp = fingerprint(measure);
                        if ctx.cache.changed(measure.uuid, fp) {
                            report.changed += 1;
                        }
                        ctx.cache.commit(fp, last, state.clone());
                    }
                    start = state.end.clone();
                    print = state.end_print.clone();
                    report.measures.push(state);
                }
                MeasureStep::Overflow(operations) => {
                    ctx.fixup.fixup(doc, None, &operations, true)?;
                    report.patches += operations.len();
                    report.overflow_passes += 1;
                    continue 'pass;
                }
                MeasureStep::Restart(_) => {
                    return Err(EngineError::Invariant("restart escaped the measure loop".into()));
                }
            }
            idx += 1;
        }
        break;
    }

    log::debug!(
        "validated {} measures ({} cached, {} patches, {} restarts, {} overflow passes)",
        report.measures.len(),
        report.skipped,
        report.patches,
        report.restarts,
        report.overflow_passes
    );
    Ok(report)
}
