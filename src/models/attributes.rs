//! Attribute payloads: clefs, time and key signatures, staff details
//!
//! These mirror the explicit fields an Attributes element can declare.
//! Anything left empty is inherited through the attribute cascade.

use super::types::{Accidental, StartStop};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClefSign {
    G,
    F,
    C,
    #[serde(rename = "percussion")]
    Percussion,
    #[serde(rename = "TAB")]
    Tab,
    #[serde(rename = "none")]
    None,
}

impl ClefSign {
    /// Conventional line for a sign when none is declared
    pub fn standard_line(self) -> u32 {
        match self {
            ClefSign::G => 2,
            ClefSign::F => 4,
            ClefSign::C | ClefSign::Percussion | ClefSign::None => 3,
            ClefSign::Tab => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clef {
    pub sign: ClefSign,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub clef_octave_change: Option<i32>,
    /// Staff number within the part (1-based)
    #[serde(default = "default_number")]
    pub number: usize,
}

fn default_number() -> usize {
    1
}

impl Clef {
    pub fn treble(number: usize) -> Self {
        Self {
            sign: ClefSign::G,
            line: Some(2),
            clef_octave_change: None,
            number,
        }
    }

    pub fn line(&self) -> u32 {
        self.line.unwrap_or_else(|| self.sign.standard_line())
    }

    /// Offset added to `(octave - 3) * 3.5 + step offset` to get the staff line
    /// (1 = bottom line) of a pitch under this clef.
    pub fn line_offset(&self) -> f64 {
        let line = self.line() as f64;
        let base = match self.sign {
            // G4 sits on the clef line
            ClefSign::G | ClefSign::Percussion | ClefSign::None | ClefSign::Tab => line - 5.5,
            // F3 sits on the clef line
            ClefSign::F => line - 1.5,
            // C4 sits on the clef line
            ClefSign::C => line - 3.5,
        };
        base - self.clef_octave_change.unwrap_or(0) as f64 * 3.5
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeSymbol {
    Common,
    Cut,
    SingleNumber,
    Normal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Time {
    /// Numerators, possibly composite ("3+2")
    #[serde(default)]
    pub beats: Vec<String>,
    #[serde(default)]
    pub beat_types: Vec<u32>,
    #[serde(default)]
    pub symbol: Option<TimeSymbol>,
    #[serde(default)]
    pub senza_misura: bool,
}

impl Time {
    pub fn common() -> Self {
        Self {
            beats: vec!["4".to_string()],
            beat_types: vec![4],
            symbol: Some(TimeSymbol::Common),
            senza_misura: false,
        }
    }

    pub fn new(beats: u32, beat_type: u32) -> Self {
        Self {
            beats: vec![beats.to_string()],
            beat_types: vec![beat_type],
            symbol: None,
            senza_misura: false,
        }
    }

    /// Number of `+`-separated numerator groups across all components
    pub fn numerator_segments(&self) -> usize {
        self.beats.iter().map(|b| b.split('+').count()).sum()
    }

    /// Capacity of one bar in divisions, or `None` for unmetered time.
    pub fn bar_divisions(&self, divisions: u32) -> Option<u32> {
        if self.senza_misura || self.beat_types.is_empty() {
            return None;
        }
        let mut quarters = 0.0;
        for (beats, beat_type) in self.beats.iter().zip(&self.beat_types) {
            if *beat_type == 0 {
                continue;
            }
            let count: u32 = beats
                .split('+')
                .filter_map(|part| part.trim().parse::<u32>().ok())
                .sum();
            quarters += count as f64 * 4.0 / *beat_type as f64;
        }
        Some((quarters * divisions as f64).ceil() as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySignature {
    pub fifths: i32,
    #[serde(default)]
    pub mode: Option<String>,
}

impl KeySignature {
    pub fn c_major() -> Self {
        Self {
            fifths: 0,
            mode: Some("major".to_string()),
        }
    }

    /// Accidentals drawn for this signature, in drawing order
    pub fn accidentals(&self) -> Vec<Accidental> {
        let count = self.fifths.unsigned_abs().min(7) as usize;
        let glyph = if self.fifths > 0 {
            Accidental::Sharp
        } else {
            Accidental::Flat
        };
        vec![glyph; count]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffTuning {
    pub line: u32,
    pub step: String,
    pub octave: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffDetails {
    #[serde(default = "default_number")]
    pub number: usize,
    #[serde(default)]
    pub staff_lines: Option<u32>,
    #[serde(default)]
    pub staff_size: Option<f64>,
    #[serde(default)]
    pub staff_type: Option<String>,
    #[serde(default)]
    pub capo: Option<u32>,
    #[serde(default)]
    pub show_frets: Option<String>,
    #[serde(default)]
    pub staff_tunings: Option<Vec<StaffTuning>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repeat {
    #[serde(rename = "type")]
    pub kind: StartStop,
    #[serde(default)]
    pub slashes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleRest {
    pub count: u32,
    #[serde(default)]
    pub use_symbols: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureStyle {
    #[serde(default)]
    pub number: Option<usize>,
    #[serde(default)]
    pub slash: Option<Repeat>,
    #[serde(default)]
    pub beat_repeat: Option<Repeat>,
    #[serde(default)]
    pub measure_repeat: Option<Repeat>,
    #[serde(default)]
    pub multiple_rest: Option<MultipleRest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartSymbolKind {
    Brace,
    Bracket,
    Line,
    Square,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartSymbol {
    #[serde(rename = "type")]
    pub kind: PartSymbolKind,
    #[serde(default)]
    pub top_staff: Option<usize>,
    #[serde(default)]
    pub bottom_staff: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transpose {
    pub chromatic: i32,
    #[serde(default)]
    pub diatonic: Option<i32>,
    #[serde(default)]
    pub octave_change: Option<i32>,
}

/// Explicit fields of an Attributes element
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributesData {
    #[serde(default)]
    pub divisions: Option<u32>,
    #[serde(default)]
    pub clefs: Vec<Clef>,
    #[serde(default)]
    pub times: Vec<Time>,
    #[serde(default)]
    pub key_signatures: Vec<KeySignature>,
    #[serde(default)]
    pub staff_details: Vec<StaffDetails>,
    #[serde(default)]
    pub measure_styles: Vec<MeasureStyle>,
    #[serde(default)]
    pub staves: Option<usize>,
    #[serde(default)]
    pub part_symbol: Option<PartSymbol>,
    #[serde(default)]
    pub transposes: Vec<Transpose>,
    #[serde(default)]
    pub instruments: Option<String>,
}

impl AttributesData {
    pub fn clef_for(&self, staff: usize) -> Option<&Clef> {
        self.clefs.iter().find(|c| c.number == staff)
    }

    pub fn staff_details_for(&self, staff: usize) -> Option<&StaffDetails> {
        self.staff_details.iter().find(|d| d.number == staff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_divisions_common_time() {
        assert_eq!(Time::common().bar_divisions(4), Some(16));
        assert_eq!(Time::new(3, 4).bar_divisions(2), Some(6));
    }

    #[test]
    fn test_bar_divisions_composite_and_compound() {
        let time = Time {
            beats: vec!["3+2".to_string()],
            beat_types: vec![8],
            symbol: None,
            senza_misura: false,
        };
        // five eighths = 2.5 quarters
        assert_eq!(time.bar_divisions(2), Some(5));
        assert_eq!(time.numerator_segments(), 2);
    }

    #[test]
    fn test_senza_misura_is_unbounded() {
        let time = Time {
            senza_misura: true,
            ..Time::common()
        };
        assert_eq!(time.bar_divisions(4), None);
    }

    #[test]
    fn test_clef_line_offsets() {
        // E4 is the bottom line in treble
        let treble = Clef::treble(1);
        assert_eq!(treble.line_offset() + 3.5 + 1.0, 1.0);

        // G2 is the bottom line in bass
        let bass = Clef {
            sign: ClefSign::F,
            line: Some(4),
            clef_octave_change: None,
            number: 1,
        };
        assert_eq!(bass.line_offset() - 3.5 + 2.0, 1.0);
    }

    #[test]
    fn test_key_accidentals() {
        let key = KeySignature { fifths: -3, mode: None };
        assert_eq!(key.accidentals(), vec![Accidental::Flat; 3]);
        assert!(KeySignature::c_major().accidentals().is_empty());
    }
}
