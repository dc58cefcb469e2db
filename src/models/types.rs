//! Shared enums for the score model
//!
//! Kinds, owner types and the small vocabulary types that every other
//! model module builds on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every element kind that can live inside a segment.
///
/// The declaration order is not significant; use [`ModelKind::priority`]
/// to order elements that share a division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    Print,
    Grouping,
    FiguredBass,
    Attributes,
    Sound,
    Direction,
    Harmony,
    Proxy,
    Spacer,
    Chord,
    VisualCursor,
    Barline,
}

impl ModelKind {
    /// Render priority among elements at the same division. Lower sorts first.
    pub fn priority(self) -> u32 {
        match self {
            ModelKind::Print => 10,
            ModelKind::Grouping => 30,
            ModelKind::FiguredBass => 40,
            ModelKind::Attributes => 110,
            ModelKind::Sound => 120,
            ModelKind::Direction => 130,
            ModelKind::Harmony => 140,
            ModelKind::Proxy => 150,
            ModelKind::Spacer => 160,
            ModelKind::Chord => 220,
            ModelKind::VisualCursor => 398,
            ModelKind::Barline => 399,
        }
    }

    /// Name used in the `_class` tag of serialized models.
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Print => "Print",
            ModelKind::Grouping => "Grouping",
            ModelKind::FiguredBass => "FiguredBass",
            ModelKind::Attributes => "Attributes",
            ModelKind::Sound => "Sound",
            ModelKind::Direction => "Direction",
            ModelKind::Harmony => "Harmony",
            ModelKind::Proxy => "Proxy",
            ModelKind::Spacer => "Spacer",
            ModelKind::Chord => "Chord",
            ModelKind::VisualCursor => "VisualCursor",
            ModelKind::Barline => "Barline",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        KINDS.iter().copied().find(|k| k.name() == name)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All kinds, in priority order.
pub const KINDS: [ModelKind; 12] = [
    ModelKind::Print,
    ModelKind::Grouping,
    ModelKind::FiguredBass,
    ModelKind::Attributes,
    ModelKind::Sound,
    ModelKind::Direction,
    ModelKind::Harmony,
    ModelKind::Proxy,
    ModelKind::Spacer,
    ModelKind::Chord,
    ModelKind::VisualCursor,
    ModelKind::Barline,
];

/// Whether a segment belongs to a staff or to a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    Staff,
    Voice,
}

/// Diatonic step of a pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Staff-line offset of the step within an octave (half a line per step)
    pub fn line_offset(self) -> f64 {
        match self {
            Step::C => 0.0,
            Step::D => 0.5,
            Step::E => 1.0,
            Step::F => 1.5,
            Step::G => 2.0,
            Step::A => 2.5,
            Step::B => 3.0,
        }
    }
}

/// Visual style of a barline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BarStyle {
    #[default]
    Regular,
    Dotted,
    Dashed,
    Heavy,
    LightLight,
    LightHeavy,
    HeavyLight,
    HeavyHeavy,
    Tick,
    Short,
    None,
}

/// Which pages a set of page margins applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddEvenBoth {
    Odd,
    Even,
    #[default]
    Both,
}

/// Start/stop marker used by measure styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartStop {
    #[default]
    Start,
    Stop,
}

/// Written accidental on a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Accidental {
    Sharp,
    Flat,
    Natural,
    DoubleSharp,
    DoubleFlat,
}

impl Accidental {
    /// Glyph width in tenths
    pub fn width(self) -> f64 {
        match self {
            Accidental::Flat => 10.0,
            Accidental::Sharp => 11.0,
            Accidental::Natural => 11.0,
            Accidental::DoubleFlat => 19.0,
            Accidental::DoubleSharp => 13.0,
        }
    }
}
