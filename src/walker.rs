//! Walk a part's measures in document order, carrying the running score
//! state (divisions, key, time signature) and the absolute start beat of
//! each measure.
//!
//! The state is an explicit value folded from one measure to the next.
//! Attribute changes found in a measure apply to that measure's content and
//! stay in effect until changed again.

use crate::model::{Attributes, Barline, Measure, Note, Part, TimeSignature};
use crate::pitch::KeySignature;

/// Divisions per quarter note when the document never declares any.
pub const DEFAULT_DIVISIONS: i32 = 2;

/// Score-level state in effect for a measure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreState {
    pub divisions: i32,
    pub key: KeySignature,
    pub time: TimeSignature,
}

impl Default for ScoreState {
    fn default() -> Self {
        Self {
            divisions: DEFAULT_DIVISIONS,
            key: KeySignature::default(),
            time: TimeSignature::default(),
        }
    }
}

impl ScoreState {
    /// Initial state for a part: the first divisions, key and complete time
    /// signature found anywhere in it, falling back to the defaults.
    pub fn seeded(part: &Part) -> Self {
        let all_attrs = || part.measures.iter().flat_map(|m| m.attributes.iter());
        let defaults = Self::default();
        Self {
            divisions: all_attrs()
                .find_map(|a| a.divisions.filter(|d| *d > 0))
                .unwrap_or(defaults.divisions),
            key: all_attrs()
                .find_map(|a| a.key.as_ref())
                .map_or(defaults.key, |k| KeySignature::new(k.fifths)),
            time: all_attrs().find_map(|a| a.time).unwrap_or(defaults.time),
        }
    }

    /// State after one `<attributes>` block.
    pub fn apply(mut self, attrs: &Attributes) -> Self {
        match attrs.divisions {
            Some(d) if d > 0 => self.divisions = d,
            Some(d) => log::warn!("ignoring non-positive divisions {d}"),
            None => {}
        }
        if let Some(ref key) = attrs.key {
            self.key = KeySignature::new(key.fifths);
        }
        if let Some(time) = attrs.time {
            self.time = time;
        }
        self
    }
}

/// One measure as seen by the walk.
#[derive(Debug, Clone)]
pub struct WalkedMeasure<'a> {
    /// Position in document order (0-based)
    pub index: usize,
    pub measure: &'a Measure,
    /// Absolute beat at which the measure begins
    pub start_beat: f64,
    /// State carried in from the previous measure
    pub previous: ScoreState,
    /// State in effect for this measure's content
    pub state: ScoreState,
}

impl<'a> WalkedMeasure<'a> {
    /// Measure number as written in the source.
    pub fn number(&self) -> i32 {
        self.measure.number
    }

    pub fn notes(&self) -> &'a [Note] {
        &self.measure.notes
    }

    pub fn barlines(&self) -> &'a [Barline] {
        &self.measure.barlines
    }

    /// Absolute beat at which the next measure begins.
    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.measure.span_beats(self.state.divisions)
    }

    pub fn key_changed(&self) -> bool {
        self.previous.key != self.state.key
    }

    pub fn time_changed(&self) -> bool {
        self.previous.time != self.state.time
    }
}

/// Lazy, single-pass iterator over a part's measures.
pub struct MeasureWalker<'a> {
    measures: std::slice::Iter<'a, Measure>,
    index: usize,
    state: ScoreState,
    cursor: f64,
}

impl<'a> MeasureWalker<'a> {
    pub fn new(measures: &'a [Measure], initial: ScoreState) -> Self {
        Self {
            measures: measures.iter(),
            index: 0,
            state: initial,
            cursor: 0.0,
        }
    }

    /// Walk a part starting from its seeded state.
    pub fn for_part(part: &'a Part) -> Self {
        Self::new(&part.measures, ScoreState::seeded(part))
    }

    /// State in effect after the last measure yielded so far.
    pub fn state(&self) -> ScoreState {
        self.state
    }
}

impl<'a> Iterator for MeasureWalker<'a> {
    type Item = WalkedMeasure<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let measure = self.measures.next()?;
        let previous = self.state;
        let state = measure
            .attributes
            .iter()
            .fold(previous, |state, attrs| state.apply(attrs));

        let walked = WalkedMeasure {
            index: self.index,
            measure,
            start_beat: self.cursor,
            previous,
            state,
        };

        if walked.key_changed() {
            log::info!(
                "measure {}: key change to {}",
                measure.number,
                state.key.name()
            );
        }
        log::debug!(
            "measure {} starts at beat {} ({} divisions)",
            measure.number,
            walked.start_beat,
            state.divisions
        );

        self.cursor = walked.end_beat();
        self.state = state;
        self.index += 1;
        Some(walked)
    }
}
