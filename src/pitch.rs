//! Pitch spelling: key-signature tables and measure-scoped accidentals.
//!
//! A written note only carries an `<alter>` when the engraver put one
//! there. Everything else is implied: an earlier accidental on the same
//! letter in the same measure wins, otherwise the key signature decides.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Note letter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl Step {
    pub fn as_char(&self) -> char {
        match self {
            Step::A => 'A',
            Step::B => 'B',
            Step::C => 'C',
            Step::D => 'D',
            Step::E => 'E',
            Step::F => 'F',
            Step::G => 'G',
        }
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(Step::A),
            "B" => Ok(Step::B),
            "C" => Ok(Step::C),
            "D" => Ok(Step::D),
            "E" => Ok(Step::E),
            "F" => Ok(Step::F),
            "G" => Ok(Step::G),
            other => Err(format!("invalid step '{other}'")),
        }
    }
}

/// Order in which sharps are added to a key signature.
pub const SHARP_ORDER: [Step; 7] = [Step::F, Step::C, Step::G, Step::D, Step::A, Step::E, Step::B];
/// Order in which flats are added to a key signature.
pub const FLAT_ORDER: [Step; 7] = [Step::B, Step::E, Step::A, Step::D, Step::G, Step::C, Step::F];

/// Written accidental of a resolved note. `Natural` means no mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
    Flat,
    DoubleSharp,
    DoubleFlat,
}

impl Accidental {
    /// Spelling for a semitone alteration. Anything outside ±2 (and
    /// microtonal values truncated to 0) is written without a mark.
    pub fn from_alter(alter: i32) -> Self {
        match alter {
            1 => Accidental::Sharp,
            -1 => Accidental::Flat,
            2 => Accidental::DoubleSharp,
            -2 => Accidental::DoubleFlat,
            _ => Accidental::Natural,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
            Accidental::DoubleSharp => "##",
            Accidental::DoubleFlat => "bb",
        }
    }
}

/// A fully spelled pitch, e.g. `F#4`. Two notes tie only when their
/// spelled pitches are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpelledPitch {
    pub step: Step,
    pub accidental: Accidental,
    pub octave: i32,
}

impl fmt::Display for SpelledPitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.step.as_char(), self.accidental.suffix(), self.octave)
    }
}

impl Serialize for SpelledPitch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Key signature as a signed circle-of-fifths count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeySignature {
    pub fifths: i32,
}

impl KeySignature {
    pub fn new(fifths: i32) -> Self {
        Self { fifths }
    }

    /// Accidental the key signature implies for a letter.
    pub fn accidental_for(&self, step: Step) -> Accidental {
        let count = self.fifths.unsigned_abs().min(7) as usize;
        if self.fifths > 0 && SHARP_ORDER[..count].contains(&step) {
            Accidental::Sharp
        } else if self.fifths < 0 && FLAT_ORDER[..count].contains(&step) {
            Accidental::Flat
        } else {
            Accidental::Natural
        }
    }

    /// Display name, or a literal fifths count outside the named range.
    pub fn name(&self) -> String {
        let name = match self.fifths {
            -7 => "Cb Major / Ab minor",
            -6 => "Gb Major / Eb minor",
            -5 => "Db Major / Bb minor",
            -4 => "Ab Major / F minor",
            -3 => "Eb Major / C minor",
            -2 => "Bb Major / G minor",
            -1 => "F Major / D minor",
            0 => "C Major / A minor",
            1 => "G Major / E minor",
            2 => "D Major / B minor",
            3 => "A Major / F# minor",
            4 => "E Major / C# minor",
            5 => "B Major / G# minor",
            6 => "F# Major / D# minor",
            7 => "C# Major / A# minor",
            n => return format!("{n} fifths"),
        };
        name.to_string()
    }
}

/// Explicit alterations seen so far in one measure, keyed by letter.
/// A fresh table is created for every measure.
#[derive(Debug, Clone, Default)]
pub struct MeasureAccidentals {
    overrides: HashMap<Step, i32>,
}

impl MeasureAccidentals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the written accidental for `step`.
    ///
    /// An explicit alteration is recorded and wins for the rest of the
    /// measure (a natural included). Without one, an earlier alteration
    /// of the same letter is reused; failing that, the key decides.
    pub fn resolve(&mut self, step: Step, explicit_alter: Option<i32>, key: KeySignature) -> Accidental {
        if let Some(alter) = explicit_alter {
            self.overrides.insert(step, alter);
            return Accidental::from_alter(alter);
        }
        match self.overrides.get(&step) {
            Some(&alter) => Accidental::from_alter(alter),
            None => key.accidental_for(step),
        }
    }
}
