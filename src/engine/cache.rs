//! Cross-call cache of validated measures, their layouts and line placement
//!
//! A measure's validation state is reused verbatim when its content
//! fingerprint is unchanged and it sits in the same neighborhood: the same
//! snapshots and Print flow into it and it is still (or still not) the last
//! measure of the document. Its layout is reused when, in addition, it is laid
//! out on a line with the same members under the same assumptions.
//!
//! The finished layout of every measure (after postprocessing) is kept too,
//! so a measure's version only moves when what was drawn for it changes.

use super::layout::MeasureLayout;
use super::line_breaker::PlacementHint;
use super::snapshot::PartAttributes;
use crate::models::{Measure, PrintData};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Attribute and Print flow through one validated measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureState {
    pub uuid: Uuid,
    pub start: PartAttributes,
    pub end: PartAttributes,
    pub start_print: Option<PrintData>,
    pub end_print: Option<PrintData>,
}

/// The line a measure was laid out on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSignature {
    /// Every measure on the line, in order
    pub neighbors: Vec<Uuid>,
    pub shortest: u32,
    pub line: usize,
    pub lines: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    fingerprint: u64,
    last_in_document: bool,
    state: MeasureState,
    layout: Option<(LineSignature, MeasureLayout)>,
}

/// Hash of everything in a measure that affects validation and layout.
/// The version counter is excluded.
pub fn fingerprint(measure: &Measure) -> u64 {
    let mut hasher = DefaultHasher::new();
    measure.number.hash(&mut hasher);
    measure.implicit.hash(&mut hasher);
    measure.width.map(f64::to_bits).hash(&mut hasher);
    match serde_json::to_string(&measure.parts) {
        Ok(json) => json.hash(&mut hasher),
        // Unhashable content is never considered clean
        Err(_) => Uuid::new_v4().hash(&mut hasher),
    }
    hasher.finish()
}

#[derive(Debug, Default)]
pub struct LayoutCache {
    entries: HashMap<Uuid, CacheEntry>,
    /// Last committed finished layout per measure, version zeroed
    published: HashMap<Uuid, MeasureLayout>,
    hints: Vec<PlacementHint>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored state for `measure` if it can be reused as is
    pub fn fresh(
        &self,
        measure: &Measure,
        fingerprint: u64,
        start: &PartAttributes,
        start_print: Option<&PrintData>,
        last_in_document: bool,
    ) -> Option<&MeasureState> {
        let entry = self.entries.get(&measure.uuid)?;
        let clean = entry.fingerprint == fingerprint
            && entry.last_in_document == last_in_document
            && &entry.state.start == start
            && entry.state.start_print.as_ref() == start_print;
        clean.then_some(&entry.state)
    }

    /// Whether the committed content of `uuid` differs from `fingerprint`
    pub fn changed(&self, uuid: Uuid, fingerprint: u64) -> bool {
        self.entries
            .get(&uuid)
            .map_or(true, |entry| entry.fingerprint != fingerprint)
    }

    pub fn commit(&mut self, fingerprint: u64, last_in_document: bool, state: MeasureState) {
        self.entries.insert(
            state.uuid,
            CacheEntry {
                fingerprint,
                last_in_document,
                state,
                layout: None,
            },
        );
    }

    /// Committed layout of `uuid` if it was laid out on an identical line
    pub fn layout(&self, uuid: Uuid, fingerprint: u64, line: &LineSignature) -> Option<&MeasureLayout> {
        let entry = self.entries.get(&uuid)?;
        match &entry.layout {
            Some((signature, layout)) if entry.fingerprint == fingerprint && signature == line => Some(layout),
            _ => None,
        }
    }

    /// Remember the layout of a committed measure. Measures that were never
    /// committed are not stored.
    pub fn commit_layout(&mut self, line: LineSignature, layout: MeasureLayout) {
        if let Some(entry) = self.entries.get_mut(&layout.uuid) {
            entry.layout = Some((line, layout));
        }
    }

    /// Record the finished layout of a measure. Returns whether it differs
    /// from the one recorded before, ignoring the version.
    pub fn publish(&mut self, layout: &MeasureLayout) -> bool {
        let mut finished = layout.clone();
        finished.version = 0;
        if self.published.get(&finished.uuid) == Some(&finished) {
            return false;
        }
        self.published.insert(finished.uuid, finished);
        true
    }

    pub fn invalidate(&mut self, uuid: Uuid) {
        self.entries.remove(&uuid);
        self.published.remove(&uuid);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.published.clear();
        self.hints.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Placement hints from the last committed layout
    pub fn hints(&self) -> &[PlacementHint] {
        &self.hints
    }

    pub fn set_hints(&mut self, hints: Vec<PlacementHint>) {
        self.hints = hints;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(measure: &Measure) -> MeasureState {
        MeasureState {
            uuid: measure.uuid,
            start: PartAttributes::new(),
            end: PartAttributes::new(),
            start_print: None,
            end_print: None,
        }
    }

    #[test]
    fn test_fingerprint_ignores_version() {
        let mut measure = Measure::new("1");
        let before = fingerprint(&measure);
        measure.version += 3;
        assert_eq!(fingerprint(&measure), before);
        measure.number = "2".into();
        assert_ne!(fingerprint(&measure), before);
    }

    #[test]
    fn test_fresh_requires_same_neighborhood() {
        let measure = Measure::new("1");
        let fp = fingerprint(&measure);
        let mut cache = LayoutCache::new();
        cache.commit(fp, true, state(&measure));

        let start = PartAttributes::new();
        assert!(cache.fresh(&measure, fp, &start, None, true).is_some());
        assert!(cache.fresh(&measure, fp, &start, None, false).is_none());
        assert!(cache.fresh(&measure, fp + 1, &start, None, true).is_none());
        assert!(cache
            .fresh(&measure, fp, &start, Some(&PrintData::default()), true)
            .is_none());

        assert!(!cache.changed(measure.uuid, fp));
        cache.invalidate(measure.uuid);
        assert!(cache.changed(measure.uuid, fp));
    }

    fn layout(measure: &Measure) -> MeasureLayout {
        MeasureLayout {
            uuid: measure.uuid,
            number: measure.number.clone(),
            version: measure.version,
            attributes: PartAttributes::new(),
            end_attributes: PartAttributes::new(),
            print: None,
            elements: Vec::new(),
            width: 120.0,
            max_divisions: 4,
            origin_x: 0.0,
            origin_y: Default::default(),
            padding_top: Default::default(),
            padding_bottom: Default::default(),
        }
    }

    #[test]
    fn test_layout_reused_only_on_same_line() {
        let measure = Measure::new("1");
        let fp = fingerprint(&measure);
        let line = LineSignature {
            neighbors: vec![Uuid::new_v4(), measure.uuid],
            shortest: 1,
            line: 0,
            lines: 1,
        };
        let mut cache = LayoutCache::new();

        // uncommitted measures are never stored
        cache.commit_layout(line.clone(), layout(&measure));
        assert!(cache.layout(measure.uuid, fp, &line).is_none());

        cache.commit(fp, true, state(&measure));
        cache.commit_layout(line.clone(), layout(&measure));
        assert_eq!(cache.layout(measure.uuid, fp, &line).map(|l| l.width), Some(120.0));
        assert!(cache.layout(measure.uuid, fp + 1, &line).is_none());

        let moved = LineSignature {
            neighbors: vec![measure.uuid],
            ..line.clone()
        };
        assert!(cache.layout(measure.uuid, fp, &moved).is_none());

        // revalidation drops the stored layout
        cache.commit(fp, true, state(&measure));
        assert!(cache.layout(measure.uuid, fp, &line).is_none());
    }

    #[test]
    fn test_publish_reports_changes_only() {
        let measure = Measure::new("1");
        let mut cache = LayoutCache::new();
        let mut finished = layout(&measure);
        assert!(cache.publish(&finished));
        finished.version = 7;
        assert!(!cache.publish(&finished));
        finished.origin_x = 12.0;
        assert!(cache.publish(&finished));
        assert!(!cache.publish(&finished));

        cache.invalidate(measure.uuid);
        assert!(cache.publish(&finished));
    }
}
