//! Chords, notes and lyrics

use super::types::{Accidental, Step};
use serde::{Deserialize, Serialize};

/// Approximate width of one lyric character in tenths
pub const LYRIC_CHAR_WIDTH: f64 = 6.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pitch {
    pub step: Step,
    pub octave: i32,
    #[serde(default)]
    pub alter: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rest {
    /// Whole-measure rest
    #[serde(default)]
    pub measure: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lyric {
    pub text: String,
    #[serde(default)]
    pub number: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub pitch: Option<Pitch>,
    #[serde(default)]
    pub rest: Option<Rest>,
    #[serde(default)]
    pub accidental: Option<Accidental>,
    #[serde(default)]
    pub dots: u32,
    #[serde(default)]
    pub lyrics: Vec<Lyric>,
}

impl Note {
    pub fn pitched(step: Step, octave: i32) -> Self {
        Self {
            pitch: Some(Pitch {
                step,
                octave,
                alter: None,
            }),
            ..Default::default()
        }
    }

    pub fn rest() -> Self {
        Self {
            rest: Some(Rest::default()),
            ..Default::default()
        }
    }
}

/// One or more simultaneous notes sharing a duration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordData {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub grace: bool,
}

impl ChordData {
    pub fn is_rest(&self) -> bool {
        !self.notes.is_empty() && self.notes.iter().all(|n| n.rest.is_some())
    }

    pub fn is_whole_bar_rest(&self) -> bool {
        self.is_rest()
            && self
                .notes
                .iter()
                .any(|n| n.rest.as_ref().map(|r| r.measure).unwrap_or(false))
    }

    pub fn max_dots(&self) -> u32 {
        self.notes.iter().map(|n| n.dots).max().unwrap_or(0)
    }

    /// Widest accidental drawn in front of the chord
    pub fn accidental_width(&self) -> f64 {
        self.notes
            .iter()
            .filter_map(|n| n.accidental)
            .map(Accidental::width)
            .fold(0.0, f64::max)
    }

    pub fn has_accidental(&self) -> bool {
        self.notes.iter().any(|n| n.accidental.is_some())
    }

    /// Width of the widest lyric line attached to any note
    pub fn lyric_width(&self) -> f64 {
        self.notes
            .iter()
            .flat_map(|n| n.lyrics.iter())
            .map(|l| l.text.chars().count() as f64 * LYRIC_CHAR_WIDTH)
            .fold(0.0, f64::max)
    }
}
