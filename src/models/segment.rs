//! Segments: ordered element lists owned by a staff or a voice

use super::model::Model;
use super::types::OwnerType;
use serde::{Deserialize, Serialize};

/// Ordered elements owned by one staff or voice of one part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Staff or voice number (1-based)
    pub owner: usize,
    pub owner_type: OwnerType,
    pub part: String,
    /// Divisions per quarter note the div counts are expressed in
    #[serde(default = "default_divisions")]
    pub divisions: u32,
    #[serde(default)]
    pub models: Vec<Model>,
}

fn default_divisions() -> u32 {
    1
}

impl Segment {
    pub fn new(part: &str, owner_type: OwnerType, owner: usize, divisions: u32) -> Self {
        Self {
            owner,
            owner_type,
            part: part.to_string(),
            divisions,
            models: Vec::new(),
        }
    }

    pub fn with_models(mut self, models: Vec<Model>) -> Self {
        self.models = models;
        self
    }

    pub fn reference(&self) -> SegmentRef {
        SegmentRef {
            part: self.part.clone(),
            owner_type: self.owner_type,
            owner: self.owner,
        }
    }

    pub fn total_div_count(&self) -> u32 {
        self.models.iter().map(|m| m.div_count).sum()
    }

    /// Division at which the element at `idx` starts
    pub fn division_at(&self, idx: usize) -> u32 {
        self.models.iter().take(idx).map(|m| m.div_count).sum()
    }

    pub fn is_staff(&self) -> bool {
        self.owner_type == OwnerType::Staff
    }
}

/// Address of a segment inside a measure
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRef {
    pub part: String,
    pub owner_type: OwnerType,
    pub owner: usize,
}

impl SegmentRef {
    pub fn staff(part: &str, owner: usize) -> Self {
        Self {
            part: part.to_string(),
            owner_type: OwnerType::Staff,
            owner,
        }
    }

    pub fn voice(part: &str, owner: usize) -> Self {
        Self {
            part: part.to_string(),
            owner_type: OwnerType::Voice,
            owner,
        }
    }
}

impl std::fmt::Display for SegmentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.owner_type {
            OwnerType::Staff => "staff",
            OwnerType::Voice => "voice",
        };
        write!(f, "{}/{}{}", self.part, kind, self.owner)
    }
}
