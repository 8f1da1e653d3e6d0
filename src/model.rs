//! Data model for a parsed MusicXML score.
//!
//! These structures keep only what the timeline needs: measure order,
//! attribute changes, barlines and the note/rest stream. They mirror the
//! document as written; nothing here is resolved or re-indexed yet.

use serde::{Deserialize, Serialize};

use crate::pitch::Step;

/// A complete musical score parsed from MusicXML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    /// Title of the piece
    pub title: Option<String>,
    /// Composer name
    pub composer: Option<String>,
    /// MusicXML version (e.g., "3.1", "4.0")
    pub version: Option<String>,
    /// Musical parts (instruments), in part-list order
    pub parts: Vec<Part>,
}

/// A musical part (one instrument or voice).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Part identifier (e.g., "P1")
    pub id: String,
    /// Part name (e.g., "Voice")
    pub name: String,
    /// Ordered list of measures
    pub measures: Vec<Measure>,
}

/// A single measure (bar) of music.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measure {
    /// Measure number as written in the source (1-based, 0 for a pickup)
    pub number: i32,
    /// Every `<attributes>` block in the measure, in document order
    pub attributes: Vec<Attributes>,
    /// Notes and rests in this measure
    pub notes: Vec<Note>,
    /// Barlines (repeat signs, volta endings)
    pub barlines: Vec<Barline>,
}

/// Musical attributes that may change at the start of a measure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attributes {
    /// Divisions per quarter note (determines duration resolution)
    pub divisions: Option<i32>,
    /// Key signature
    pub key: Option<Key>,
    /// Time signature; only present when both beats and beat-type parse
    pub time: Option<TimeSignature>,
}

/// Key signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    /// Number of sharps (positive) or flats (negative)
    pub fifths: i32,
}

/// Time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator (e.g., 3 in 3/4)
    pub beats: i32,
    /// Denominator (e.g., 4 in 3/4)
    pub beat_type: i32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beats: 4,
            beat_type: 4,
        }
    }
}

impl std::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

/// A single note or rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Note {
    /// Pitch (None for rests and unpitched notes)
    pub pitch: Option<Pitch>,
    /// Duration in divisions; grace notes carry none
    pub duration: Option<i32>,
    /// Whether this is a rest
    pub rest: bool,
    /// Whether this note is part of a chord with the previous note
    pub chord: bool,
    /// `<tie type="start">` present
    pub tie_start: bool,
    /// `<tie type="stop">` present
    pub tie_stop: bool,
    /// Lyric syllables attached to this note
    pub lyrics: Vec<Lyric>,
}

/// Pitch of a note, as written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pitch {
    /// Note name: A, B, C, D, E, F, G
    pub step: String,
    /// Octave number (middle C = C4)
    pub octave: Option<i32>,
    /// Chromatic alteration: -1.0 = flat, 1.0 = sharp, 0.0 = natural
    pub alter: Option<f64>,
}

/// A lyric syllable attached to a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lyric {
    /// Verse number
    pub number: i32,
    pub text: String,
    /// "single", "begin", "middle" or "end"
    pub syllabic: Option<String>,
}

/// A barline (may include repeat signs and volta endings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barline {
    /// Location: "left", "right", "middle"
    pub location: String,
    /// Repeat sign
    pub repeat: Option<RepeatDirection>,
    /// Volta bracket (1st/2nd ending)
    pub ending: Option<Ending>,
}

/// Direction of a repeat barline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatDirection {
    Forward,
    Backward,
}

impl RepeatDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatDirection::Forward => "forward",
            RepeatDirection::Backward => "backward",
        }
    }
}

/// A volta bracket boundary (1st/2nd ending).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ending {
    /// Ending number(s) as written, e.g., "1", "2", "1, 2"
    pub number: String,
    pub ending_type: EndingType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndingType {
    Start,
    Stop,
    Discontinue,
}

impl Score {
    /// Create a new empty score.
    pub fn new() -> Self {
        Self {
            title: None,
            composer: None,
            version: None,
            parts: Vec::new(),
        }
    }

    /// Number of measures in the first part.
    pub fn measure_count(&self) -> usize {
        self.parts.first().map_or(0, |p| p.measures.len())
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::new()
    }
}

impl Note {
    /// Duration in beats, or None when the note cannot occupy time on the
    /// timeline (missing duration, or a non-rest without a usable pitch).
    pub fn beats(&self, divisions: i32) -> Option<f64> {
        let duration = self.duration?;
        if !self.rest && !self.has_pitch() {
            return None;
        }
        Some(duration as f64 / divisions.max(1) as f64)
    }

    /// True when the note has a pitch with a valid step letter and an octave.
    pub fn has_pitch(&self) -> bool {
        self.pitch
            .as_ref()
            .map_or(false, |p| p.octave.is_some() && p.step.parse::<Step>().is_ok())
    }
}

impl Measure {
    /// Total beats this measure advances the timeline by: the sum of every
    /// non-chord note/rest that occupies time.
    pub fn span_beats(&self, divisions: i32) -> f64 {
        self.notes
            .iter()
            .filter(|n| n.rest || !n.chord)
            .filter_map(|n| n.beats(divisions))
            .sum()
    }
}
