//! The element model: one timed item inside a segment
//!
//! A [`Model`] pairs identity and duration with a closed [`ModelData`]
//! payload. Behavior (validation and layout) lives in `engine::elements`.

use super::attributes::AttributesData;
use super::chord::ChordData;
use super::print::PrintData;
use super::types::{BarStyle, ModelKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarlineData {
    #[serde(default)]
    pub bar_style: Option<BarStyle>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionData {
    #[serde(default)]
    pub words: Vec<String>,
    /// Draw below the staff instead of above
    #[serde(default)]
    pub below: bool,
    #[serde(default)]
    pub default_y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarmonyData {
    pub root: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundData {
    #[serde(default)]
    pub tempo: Option<f64>,
    #[serde(default)]
    pub dynamics: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingData {
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiguredBassData {
    #[serde(default)]
    pub figures: Vec<String>,
}

/// Invisible filler occupying divisions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpacerData {}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualCursorData {}

/// Reference to an element owned by the primary staff of the same part.
///
/// Resolved by key; never owns or mutates its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRef {
    pub target: Uuid,
    pub kind: ModelKind,
}

/// Kind-specific payload, tagged by `_class` in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_class")]
pub enum ModelData {
    Attributes(AttributesData),
    Barline(BarlineData),
    Chord(ChordData),
    Print(PrintData),
    Direction(DirectionData),
    Sound(SoundData),
    Grouping(GroupingData),
    Harmony(HarmonyData),
    FiguredBass(FiguredBassData),
    Proxy(ProxyRef),
    Spacer(SpacerData),
    VisualCursor(VisualCursorData),
}

impl ModelData {
    /// Empty payload for a kind. Proxies need a target and are built elsewhere.
    pub fn empty(kind: ModelKind) -> Option<Self> {
        Some(match kind {
            ModelKind::Attributes => ModelData::Attributes(AttributesData::default()),
            ModelKind::Barline => ModelData::Barline(BarlineData::default()),
            ModelKind::Chord => ModelData::Chord(ChordData::default()),
            ModelKind::Print => ModelData::Print(PrintData::default()),
            ModelKind::Direction => ModelData::Direction(DirectionData::default()),
            ModelKind::Sound => ModelData::Sound(SoundData::default()),
            ModelKind::Grouping => ModelData::Grouping(GroupingData::default()),
            ModelKind::Harmony => ModelData::Harmony(HarmonyData::default()),
            ModelKind::FiguredBass => ModelData::FiguredBass(FiguredBassData::default()),
            ModelKind::Spacer => ModelData::Spacer(SpacerData::default()),
            ModelKind::VisualCursor => ModelData::VisualCursor(VisualCursorData::default()),
            ModelKind::Proxy => return None,
        })
    }
}

fn default_staff_idx() -> usize {
    1
}

/// A single element in a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[serde(default = "Uuid::new_v4")]
    pub key: Uuid,
    /// Duration in divisions
    #[serde(default)]
    pub div_count: u32,
    /// Staff (1-based) the element renders on
    #[serde(default = "default_staff_idx")]
    pub staff_idx: usize,
    #[serde(flatten)]
    pub data: ModelData,
}

impl Model {
    pub fn new(data: ModelData) -> Self {
        Self {
            key: Uuid::new_v4(),
            div_count: 0,
            staff_idx: 1,
            data,
        }
    }

    pub fn with_div_count(mut self, div_count: u32) -> Self {
        self.div_count = div_count;
        self
    }

    pub fn on_staff(mut self, staff_idx: usize) -> Self {
        self.staff_idx = staff_idx;
        self
    }

    pub fn kind(&self) -> ModelKind {
        match &self.data {
            ModelData::Attributes(_) => ModelKind::Attributes,
            ModelData::Barline(_) => ModelKind::Barline,
            ModelData::Chord(_) => ModelKind::Chord,
            ModelData::Print(_) => ModelKind::Print,
            ModelData::Direction(_) => ModelKind::Direction,
            ModelData::Sound(_) => ModelKind::Sound,
            ModelData::Grouping(_) => ModelKind::Grouping,
            ModelData::Harmony(_) => ModelKind::Harmony,
            ModelData::FiguredBass(_) => ModelKind::FiguredBass,
            ModelData::Proxy(_) => ModelKind::Proxy,
            ModelData::Spacer(_) => ModelKind::Spacer,
            ModelData::VisualCursor(_) => ModelKind::VisualCursor,
        }
    }

    /// Kind after looking through a proxy
    pub fn effective_kind(&self) -> ModelKind {
        match &self.data {
            ModelData::Proxy(proxy) => proxy.kind,
            _ => self.kind(),
        }
    }

    pub fn as_chord(&self) -> Option<&ChordData> {
        match &self.data {
            ModelData::Chord(chord) => Some(chord),
            _ => None,
        }
    }

    pub fn as_attributes(&self) -> Option<&AttributesData> {
        match &self.data {
            ModelData::Attributes(attributes) => Some(attributes),
            _ => None,
        }
    }

    pub fn as_print(&self) -> Option<&PrintData> {
        match &self.data {
            ModelData::Print(print) => Some(print),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_tagged_chord() {
        let value = json!({
            "_class": "Chord",
            "divCount": 2,
            "notes": [{ "pitch": { "step": "C", "octave": 4 } }]
        });
        let model: Model = serde_json::from_value(value).unwrap();
        assert_eq!(model.kind(), ModelKind::Chord);
        assert_eq!(model.div_count, 2);
        assert_eq!(model.staff_idx, 1);
        assert_eq!(model.as_chord().unwrap().notes.len(), 1);
    }

    #[test]
    fn test_proxy_reports_target_kind() {
        let proxy = Model::new(ModelData::Proxy(ProxyRef {
            target: Uuid::new_v4(),
            kind: ModelKind::Attributes,
        }));
        assert_eq!(proxy.kind(), ModelKind::Proxy);
        assert_eq!(proxy.effective_kind(), ModelKind::Attributes);
    }

    #[test]
    fn test_empty_payload_for_every_plain_kind() {
        for kind in crate::models::types::KINDS {
            match ModelData::empty(kind) {
                Some(data) => assert_eq!(Model::new(data).kind(), kind),
                None => assert_eq!(kind, ModelKind::Proxy),
            }
        }
    }
}
