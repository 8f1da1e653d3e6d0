//! The finished timeline handed to serializers.
//!
//! Everything exposed here is 0-based: source measure numbers are
//! decremented by one. Notes and rests are merged into one list ordered
//! by beat, with rests after notes on the same beat.

use serde::Serialize;

use crate::accumulator::{RawLyric, RawRest, TimelineAccumulator};
use crate::beat::snap_to_half_beat;
use crate::error::{Result, ScoreError};
use crate::model::{Part, RepeatDirection, Score, TimeSignature};
use crate::pitch::{KeySignature, SpelledPitch};
use crate::structure::{RepeatObservation, StructuralExtractor, TimeSignatureObservation, VoltaSpan};
use crate::ties::{consolidate_ties, SustainedNote};
use crate::walker::MeasureWalker;

/// Knobs for building a timeline.
#[derive(Debug, Clone)]
pub struct TimelineOptions {
    /// Which part to read; only one part's stream is modeled
    pub part_index: usize,
    /// Prefix for event ids, e.g. "song" gives "song-1", "song-r1"
    pub slug: String,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            part_index: 0,
            slug: "song".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub id: String,
    pub pitch: SpelledPitch,
    pub duration: f64,
    pub absolute_beat: f64,
    pub measure: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestEvent {
    pub id: String,
    pub duration: f64,
    pub absolute_beat: f64,
    pub measure: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TimelineEvent {
    Note(NoteEvent),
    Rest(RestEvent),
}

impl TimelineEvent {
    pub fn absolute_beat(&self) -> f64 {
        match self {
            TimelineEvent::Note(n) => n.absolute_beat,
            TimelineEvent::Rest(r) => r.absolute_beat,
        }
    }

    fn set_absolute_beat(&mut self, beat: f64) {
        match self {
            TimelineEvent::Note(n) => n.absolute_beat = beat,
            TimelineEvent::Rest(r) => r.absolute_beat = beat,
        }
    }

    pub fn measure(&self) -> i32 {
        match self {
            TimelineEvent::Note(n) => n.measure,
            TimelineEvent::Rest(r) => r.measure,
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            TimelineEvent::Note(n) => n.duration,
            TimelineEvent::Rest(r) => r.duration,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            TimelineEvent::Note(n) => &n.id,
            TimelineEvent::Rest(r) => &r.id,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, TimelineEvent::Rest(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricEvent {
    pub text: String,
    pub absolute_beat: f64,
    pub syllabic: Option<String>,
    pub verse: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatMarker {
    pub measure: i32,
    pub direction: RepeatDirection,
    pub absolute_beat: f64,
    pub location: String,
}

/// A backward repeat matched with the forward repeat it returns to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatPair {
    /// 1-based pair number, in backward-marker order
    pub pair_id: usize,
    /// None when the section repeats from the start of the piece
    pub start_measure: Option<i32>,
    pub end_measure: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoltaBracket {
    pub number: u32,
    pub label: String,
    pub start_measure: i32,
    pub end_measure: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeSignatureValue {
    pub numerator: i32,
    pub denominator: i32,
}

impl From<TimeSignature> for TimeSignatureValue {
    fn from(ts: TimeSignature) -> Self {
        Self {
            numerator: ts.beats,
            denominator: ts.beat_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSignatureChange {
    pub measure: i32,
    pub time_signature: TimeSignatureValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyInfo {
    pub fifths: i32,
    pub name: String,
}

impl From<KeySignature> for KeyInfo {
    fn from(key: KeySignature) -> Self {
        Self {
            fifths: key.fifths,
            name: key.name(),
        }
    }
}

/// Informational counts for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_notes: usize,
    pub total_rests: usize,
    /// Beats elapsed over the whole part (unsnapped)
    pub total_beats: f64,
    /// Highest source measure number among emitted events
    pub highest_measure: Option<i32>,
    pub final_key: KeyInfo,
    pub final_time_signature: TimeSignatureValue,
}

/// Events of the first repeated section, re-based to start at beat 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatedSection {
    pub start_measure: i32,
    pub end_measure: i32,
    pub events: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    /// Prefix every event id was built from
    pub slug: String,
    /// Initial key signature
    pub key: KeyInfo,
    /// Initial time signature
    pub time_signature: TimeSignatureValue,
    /// Initial divisions per quarter note
    pub divisions: i32,
    pub events: Vec<TimelineEvent>,
    pub repeats: Vec<RepeatMarker>,
    pub repeat_pairs: Vec<RepeatPair>,
    pub voltas: Vec<VoltaBracket>,
    pub time_signature_changes: Vec<TimeSignatureChange>,
    pub lyrics: Vec<LyricEvent>,
    pub repeated_section: Option<RepeatedSection>,
    pub summary: Summary,
}

/// Build the timeline for the part selected by `options`.
pub fn build_timeline(score: &Score, options: &TimelineOptions) -> Result<Timeline> {
    let part = score
        .parts
        .get(options.part_index)
        .ok_or(ScoreError::PartNotFound {
            index: options.part_index,
            count: score.parts.len(),
        })?;
    Ok(Timeline::from_part(part, &options.slug))
}

impl Timeline {
    /// Walk one part and assemble its timeline.
    pub fn from_part(part: &Part, slug: &str) -> Self {
        let mut walker = MeasureWalker::for_part(part);
        let initial = walker.state();
        log::info!(
            "part '{}': key {}, time {}, divisions {}",
            part.id,
            initial.key.name(),
            initial.time,
            initial.divisions
        );

        let mut accumulator = TimelineAccumulator::new();
        let mut extractor = StructuralExtractor::new();
        for walked in &mut walker {
            accumulator.process(&walked);
            extractor.observe(&walked);
        }
        let last = walker.state();

        let raw = accumulator.finish();
        let structure = extractor.finish();
        let notes = consolidate_ties(&raw.notes);
        let events = merge_events(&notes, &raw.rests, slug);

        let total_notes = notes.len();
        let total_rests = raw.rests.len();
        let highest_measure = events.iter().map(|e| e.measure() + 1).max();

        let repeats: Vec<RepeatMarker> = structure.repeats.iter().map(RepeatMarker::from).collect();
        let repeat_pairs = pair_repeats(&repeats);
        let repeated_section = repeated_section(&events, &repeats, slug);

        let summary = Summary {
            total_notes,
            total_rests,
            total_beats: raw.total_beats,
            highest_measure,
            final_key: last.key.into(),
            final_time_signature: last.time.into(),
        };
        log::info!(
            "{} notes, {} rests, {} beats, last measure {}",
            summary.total_notes,
            summary.total_rests,
            summary.total_beats,
            summary.highest_measure.unwrap_or(0)
        );

        Timeline {
            slug: slug.to_string(),
            key: initial.key.into(),
            time_signature: initial.time.into(),
            divisions: initial.divisions,
            events,
            repeats,
            repeat_pairs,
            voltas: structure.voltas.iter().map(VoltaBracket::from).collect(),
            time_signature_changes: structure
                .time_changes
                .iter()
                .map(TimeSignatureChange::from)
                .collect(),
            lyrics: raw.lyrics.iter().map(LyricEvent::from).collect(),
            repeated_section,
            summary,
        }
    }

    pub fn notes(&self) -> impl Iterator<Item = &NoteEvent> {
        self.events.iter().filter_map(|e| match e {
            TimelineEvent::Note(n) => Some(n),
            TimelineEvent::Rest(_) => None,
        })
    }

    pub fn rests(&self) -> impl Iterator<Item = &RestEvent> {
        self.events.iter().filter_map(|e| match e {
            TimelineEvent::Rest(r) => Some(r),
            TimelineEvent::Note(_) => None,
        })
    }
}

/// Merge notes and rests, order by beat with rests last on ties, then
/// number them in that order.
fn merge_events(notes: &[SustainedNote], rests: &[RawRest], slug: &str) -> Vec<TimelineEvent> {
    let mut events: Vec<TimelineEvent> = notes
        .iter()
        .map(|n| {
            TimelineEvent::Note(NoteEvent {
                id: String::new(),
                pitch: n.pitch,
                duration: n.duration,
                absolute_beat: n.beat,
                measure: n.measure - 1,
            })
        })
        .chain(rests.iter().map(|r| {
            TimelineEvent::Rest(RestEvent {
                id: String::new(),
                duration: r.duration,
                absolute_beat: r.beat,
                measure: r.measure - 1,
            })
        }))
        .collect();

    events.sort_by(|a, b| {
        a.absolute_beat()
            .total_cmp(&b.absolute_beat())
            .then(a.is_rest().cmp(&b.is_rest()))
    });
    assign_ids(&mut events, slug);
    events
}

/// Number notes and rests from 1 in list order.
fn assign_ids(events: &mut [TimelineEvent], slug: &str) {
    let (mut note_num, mut rest_num) = (0, 0);
    for event in events {
        match event {
            TimelineEvent::Note(n) => {
                note_num += 1;
                n.id = format!("{slug}-{note_num}");
            }
            TimelineEvent::Rest(r) => {
                rest_num += 1;
                r.id = format!("{slug}-r{rest_num}");
            }
        }
    }
}

/// Pair each backward repeat with the last forward repeat strictly before it.
pub fn pair_repeats(repeats: &[RepeatMarker]) -> Vec<RepeatPair> {
    repeats
        .iter()
        .filter(|r| r.direction == RepeatDirection::Backward)
        .enumerate()
        .map(|(i, backward)| RepeatPair {
            pair_id: i + 1,
            start_measure: repeats
                .iter()
                .filter(|r| r.direction == RepeatDirection::Forward && r.measure < backward.measure)
                .last()
                .map(|r| r.measure),
            end_measure: backward.measure,
        })
        .collect()
}

/// Events between the first forward and the first backward repeat
/// (inclusive), re-based so the first one sits on beat 0 and renumbered
/// from 1 as a standalone list.
///
/// Only the first pair is considered; later or nested sections are not.
pub fn repeated_section(
    events: &[TimelineEvent],
    repeats: &[RepeatMarker],
    slug: &str,
) -> Option<RepeatedSection> {
    let first = |direction: RepeatDirection| repeats.iter().find(|r| r.direction == direction);
    let forward = first(RepeatDirection::Forward)?;
    let backward = first(RepeatDirection::Backward)?;

    let mut selected: Vec<TimelineEvent> = events
        .iter()
        .filter(|e| (forward.measure..=backward.measure).contains(&e.measure()))
        .cloned()
        .collect();
    let offset = selected.first()?.absolute_beat();
    for event in &mut selected {
        event.set_absolute_beat(snap_to_half_beat(event.absolute_beat() - offset));
    }
    assign_ids(&mut selected, slug);

    Some(RepeatedSection {
        start_measure: forward.measure,
        end_measure: backward.measure,
        events: selected,
    })
}

impl From<&RepeatObservation> for RepeatMarker {
    fn from(r: &RepeatObservation) -> Self {
        Self {
            measure: r.measure - 1,
            direction: r.direction,
            absolute_beat: r.beat,
            location: r.location.clone(),
        }
    }
}

impl From<&VoltaSpan> for VoltaBracket {
    fn from(v: &VoltaSpan) -> Self {
        Self {
            number: v.number,
            label: v.label.clone(),
            start_measure: v.start_measure - 1,
            end_measure: v.end_measure - 1,
        }
    }
}

impl From<&TimeSignatureObservation> for TimeSignatureChange {
    fn from(t: &TimeSignatureObservation) -> Self {
        Self {
            measure: t.measure - 1,
            time_signature: t.time.into(),
        }
    }
}

impl From<&RawLyric> for LyricEvent {
    fn from(l: &RawLyric) -> Self {
        Self {
            text: l.text.clone(),
            absolute_beat: l.beat,
            syllabic: l.syllabic.clone(),
            verse: l.verse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::{Accidental, Step};
    use pretty_assertions::assert_eq;

    fn marker(measure: i32, direction: RepeatDirection) -> RepeatMarker {
        RepeatMarker {
            measure,
            direction,
            absolute_beat: 0.0,
            location: String::new(),
        }
    }

    fn note_at(beat: f64, measure: i32) -> SustainedNote {
        SustainedNote {
            pitch: SpelledPitch {
                step: Step::C,
                accidental: Accidental::Natural,
                octave: 4,
            },
            duration: 1.0,
            beat,
            measure,
        }
    }

    fn rest_at(beat: f64, measure: i32) -> RawRest {
        RawRest {
            duration: 1.0,
            beat,
            measure,
        }
    }

    #[test]
    fn rests_sort_after_notes_on_the_same_beat() {
        let events = merge_events(
            &[note_at(1.0, 1), note_at(0.0, 1)],
            &[rest_at(1.0, 1), rest_at(0.5, 1)],
            "tune",
        );
        let order: Vec<(&str, f64)> = events.iter().map(|e| (e.id(), e.absolute_beat())).collect();
        assert_eq!(
            order,
            vec![("tune-1", 0.0), ("tune-r1", 0.5), ("tune-2", 1.0), ("tune-r2", 1.0)]
        );
        assert_eq!(events[0].measure(), 0);
    }

    #[test]
    fn pairs_backward_with_last_earlier_forward() {
        let repeats = vec![
            marker(0, RepeatDirection::Forward),
            marker(4, RepeatDirection::Forward),
            marker(8, RepeatDirection::Backward),
            marker(12, RepeatDirection::Backward),
        ];
        assert_eq!(
            pair_repeats(&repeats),
            vec![
                RepeatPair {
                    pair_id: 1,
                    start_measure: Some(4),
                    end_measure: 8,
                },
                RepeatPair {
                    pair_id: 2,
                    start_measure: Some(4),
                    end_measure: 12,
                },
            ]
        );
        let lone = pair_repeats(&[marker(3, RepeatDirection::Backward)]);
        assert_eq!(lone[0].start_measure, None);
    }

    #[test]
    fn repeated_section_is_rebased() {
        let events = merge_events(
            &[note_at(0.0, 1), note_at(4.0, 2), note_at(8.5, 3), note_at(12.0, 4)],
            &[rest_at(9.5, 3)],
            "song",
        );
        let repeats = vec![marker(1, RepeatDirection::Forward), marker(2, RepeatDirection::Backward)];
        let section = repeated_section(&events, &repeats, "song").unwrap();
        assert_eq!(section.start_measure, 1);
        assert_eq!(section.end_measure, 2);
        let beats: Vec<(&str, f64)> = section
            .events
            .iter()
            .map(|e| (e.id(), e.absolute_beat()))
            .collect();
        assert_eq!(beats, vec![("song-1", 0.0), ("song-2", 4.5), ("song-r1", 5.5)]);
        // The main list keeps its own numbering.
        assert_eq!(events[1].id(), "song-2");
    }

    #[test]
    fn no_section_without_both_directions() {
        let events = merge_events(&[note_at(0.0, 1)], &[], "song");
        assert_eq!(
            repeated_section(&events, &[marker(0, RepeatDirection::Backward)], "song"),
            None
        );
        assert_eq!(repeated_section(&events, &[], "song"), None);
    }
}
