//! Measures and their per-part segment tables

use super::segment::{Segment, SegmentRef};
use super::types::OwnerType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Staff and voice segments of one part within a measure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurePart {
    #[serde(default)]
    pub staves: BTreeMap<usize, Segment>,
    #[serde(default)]
    pub voices: BTreeMap<usize, Segment>,
}

impl MeasurePart {
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.staves.values().chain(self.voices.values())
    }

    pub fn segments_mut(&mut self) -> impl Iterator<Item = &mut Segment> {
        self.staves.values_mut().chain(self.voices.values_mut())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub implicit: bool,
    /// Authored width hint in tenths
    #[serde(default)]
    pub width: Option<f64>,
    /// Bumped once per committed layout change
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub parts: BTreeMap<String, MeasurePart>,
}

impl Measure {
    pub fn new(number: &str) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            number: number.to_string(),
            implicit: false,
            width: None,
            version: 0,
            parts: BTreeMap::new(),
        }
    }

    pub fn insert_segment(&mut self, segment: Segment) {
        let part = self.parts.entry(segment.part.clone()).or_default();
        let table = match segment.owner_type {
            OwnerType::Staff => &mut part.staves,
            OwnerType::Voice => &mut part.voices,
        };
        table.insert(segment.owner, segment);
    }

    pub fn segment(&self, at: &SegmentRef) -> Option<&Segment> {
        let part = self.parts.get(&at.part)?;
        match at.owner_type {
            OwnerType::Staff => part.staves.get(&at.owner),
            OwnerType::Voice => part.voices.get(&at.owner),
        }
    }

    pub fn segment_mut(&mut self, at: &SegmentRef) -> Option<&mut Segment> {
        let part = self.parts.get_mut(&at.part)?;
        match at.owner_type {
            OwnerType::Staff => part.staves.get_mut(&at.owner),
            OwnerType::Voice => part.voices.get_mut(&at.owner),
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.parts.values().flat_map(|p| p.segments())
    }

    pub fn segments_mut(&mut self) -> impl Iterator<Item = &mut Segment> {
        self.parts.values_mut().flat_map(|p| p.segments_mut())
    }

    /// Shortest non-zero duration of any voice element
    pub fn shortest_div_count(&self) -> Option<u32> {
        self.parts
            .values()
            .flat_map(|p| p.voices.values())
            .flat_map(|v| v.models.iter())
            .map(|m| m.div_count)
            .filter(|d| *d > 0)
            .min()
    }
}
