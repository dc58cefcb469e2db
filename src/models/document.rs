//! Score document: header plus ordered measures

use super::measure::Measure;
use super::print::PrintData;
use super::types::ModelKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Engraving defaults in tenths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineWidths {
    #[serde(default = "default_light_barline")]
    pub light_barline: f64,
    #[serde(default = "default_heavy_barline")]
    pub heavy_barline: f64,
    #[serde(default = "default_separation")]
    pub barline_separation: f64,
}

fn default_light_barline() -> f64 {
    1.8
}

fn default_heavy_barline() -> f64 {
    5.0
}

fn default_separation() -> f64 {
    4.0
}

impl Default for LineWidths {
    fn default() -> Self {
        Self {
            light_barline: default_light_barline(),
            heavy_barline: default_heavy_barline(),
            barline_separation: default_separation(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDefaults {
    #[serde(default)]
    pub line_widths: LineWidths,
}

/// Document-wide metadata read by models during validation and layout
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreHeader {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub part_list: Vec<PartInfo>,
    #[serde(default)]
    pub defaults: ScoreDefaults,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub header: ScoreHeader,
    #[serde(default)]
    pub measures: Vec<Measure>,
}

impl Document {
    /// Part ids in header order, followed by any part only seen in measures
    pub fn part_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.header.part_list.iter().map(|p| p.id.clone()).collect();
        for measure in &self.measures {
            for id in measure.parts.keys() {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }

    /// First Print element found scanning measures from the start
    pub fn first_print(&self) -> Option<&PrintData> {
        let first_part = self.part_ids().into_iter().next()?;
        self.measures.iter().find_map(|m| find_print(m, &first_part))
    }

    pub fn index_of(&self, uuid: uuid::Uuid) -> Option<usize> {
        self.measures.iter().position(|m| m.uuid == uuid)
    }
}

/// Print element at the head of the first staff of `part`, if any
pub fn find_print<'a>(measure: &'a Measure, part: &str) -> Option<&'a PrintData> {
    let staff = measure.parts.get(part)?.staves.get(&1)?;
    staff
        .models
        .iter()
        .take_while(|m| m.div_count == 0)
        .find(|m| m.kind() == ModelKind::Print)
        .and_then(|m| m.as_print())
}
