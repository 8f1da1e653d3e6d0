//! Turn walked measures into raw, dated note, rest and lyric events.
//!
//! Events here still use the source's 1-based measure numbers and carry
//! tie flags; ties are merged afterwards by [`crate::ties`].

use crate::beat::{round_duration, snap_to_half_beat};
use crate::model::Note;
use crate::pitch::{MeasureAccidentals, SpelledPitch, Step};
use crate::walker::WalkedMeasure;

/// A pitched note before tie consolidation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNote {
    pub pitch: SpelledPitch,
    /// Duration in beats (unrounded)
    pub duration: f64,
    /// Snapped absolute beat
    pub beat: f64,
    /// Source measure number
    pub measure: i32,
    pub tie_start: bool,
    pub tie_stop: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRest {
    pub duration: f64,
    pub beat: f64,
    pub measure: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawLyric {
    pub text: String,
    pub beat: f64,
    pub syllabic: Option<String>,
    pub verse: i32,
    pub measure: i32,
}

/// Everything the accumulator produced for one part.
#[derive(Debug, Clone, Default)]
pub struct RawTimeline {
    pub notes: Vec<RawNote>,
    pub rests: Vec<RawRest>,
    pub lyrics: Vec<RawLyric>,
    /// Unsnapped beat cursor after the last measure
    pub total_beats: f64,
}

/// Beat cursor plus the events emitted so far.
#[derive(Debug, Default)]
pub struct TimelineAccumulator {
    out: RawTimeline,
    cursor: f64,
}

impl TimelineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Process one measure's notes and rests in document order.
    /// Returns the beat cursor after the measure.
    pub fn process(&mut self, walked: &WalkedMeasure) -> f64 {
        self.cursor = walked.start_beat;
        let divisions = walked.state.divisions;
        let mut accidentals = MeasureAccidentals::new();

        for note in walked.notes() {
            let Some(beats) = note.beats(divisions) else {
                log::debug!(
                    "measure {}: skipping note without pitch or duration",
                    walked.number()
                );
                continue;
            };

            if note.rest {
                self.out.rests.push(RawRest {
                    duration: round_duration(beats),
                    beat: snap_to_half_beat(self.cursor),
                    measure: walked.number(),
                });
                self.cursor += beats;
                continue;
            }

            let Some(pitch) = spell(note, &mut accidentals, walked) else {
                continue;
            };

            let beat = if note.chord {
                self.out.notes.last().map_or(self.cursor, |prev| prev.beat)
            } else {
                self.cursor
            };
            let beat = snap_to_half_beat(beat);

            self.out.notes.push(RawNote {
                pitch,
                duration: beats,
                beat,
                measure: walked.number(),
                tie_start: note.tie_start,
                tie_stop: note.tie_stop,
            });

            for lyric in &note.lyrics {
                self.out.lyrics.push(RawLyric {
                    text: lyric.text.clone(),
                    beat,
                    syllabic: lyric.syllabic.clone(),
                    verse: lyric.number,
                    measure: walked.number(),
                });
            }

            if !note.chord {
                self.cursor += beats;
            }
        }

        self.cursor
    }

    pub fn finish(mut self) -> RawTimeline {
        self.out.total_beats = self.cursor;
        self.out
    }
}

fn spell(note: &Note, accidentals: &mut MeasureAccidentals, walked: &WalkedMeasure) -> Option<SpelledPitch> {
    let pitch = note.pitch.as_ref()?;
    let step: Step = pitch.step.parse().ok()?;
    let octave = pitch.octave?;
    // Microtonal alterations truncate toward zero.
    let explicit = pitch.alter.map(|a| a as i32);
    let accidental = accidentals.resolve(step, explicit, walked.state.key);
    Some(SpelledPitch {
        step,
        accidental,
        octave,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attributes, Key, Lyric, Measure, Pitch};
    use crate::pitch::Accidental;
    use crate::walker::{MeasureWalker, ScoreState};

    fn pitched(step: &str, octave: i32, alter: Option<f64>, duration: i32) -> Note {
        Note {
            pitch: Some(Pitch {
                step: step.to_string(),
                octave: Some(octave),
                alter,
            }),
            duration: Some(duration),
            ..Default::default()
        }
    }

    fn rest(duration: i32) -> Note {
        Note {
            rest: true,
            duration: Some(duration),
            ..Default::default()
        }
    }

    fn run(measures: &[Measure]) -> (RawTimeline, Vec<(f64, f64)>) {
        let mut acc = TimelineAccumulator::new();
        let mut spans = Vec::new();
        for walked in MeasureWalker::new(measures, ScoreState::default()) {
            let start = walked.start_beat;
            let end = acc.process(&walked);
            assert_eq!(end, walked.end_beat());
            spans.push((start, end));
        }
        (acc.finish(), spans)
    }

    fn measure(number: i32, fifths: Option<i32>, notes: Vec<Note>) -> Measure {
        Measure {
            number,
            attributes: fifths
                .map(|f| Attributes {
                    key: Some(Key { fifths: f }),
                    ..Default::default()
                })
                .into_iter()
                .collect(),
            notes,
            barlines: Vec::new(),
        }
    }

    #[test]
    fn notes_and_rests_advance_the_cursor() {
        let (raw, spans) = run(&[measure(1, None, vec![pitched("C", 4, None, 2), rest(1), pitched("E", 4, None, 3)])]);
        assert_eq!(raw.notes.len(), 2);
        assert_eq!(raw.rests.len(), 1);
        assert_eq!(raw.notes[0].beat, 0.0);
        assert_eq!(raw.rests[0].beat, 1.0);
        assert_eq!(raw.rests[0].duration, 0.5);
        assert_eq!(raw.notes[1].beat, 1.5);
        assert_eq!(raw.notes[1].duration, 1.5);
        assert_eq!(spans, vec![(0.0, 3.0)]);
        assert_eq!(raw.total_beats, 3.0);
    }

    #[test]
    fn chord_members_share_the_first_note_beat() {
        let mut third = pitched("E", 4, None, 2);
        third.chord = true;
        let mut fifth = pitched("G", 4, None, 2);
        fifth.chord = true;
        let (raw, spans) = run(&[measure(
            1,
            None,
            vec![pitched("C", 4, None, 2), third, fifth, pitched("D", 4, None, 2)],
        )]);
        let beats: Vec<f64> = raw.notes.iter().map(|n| n.beat).collect();
        assert_eq!(beats, vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(spans, vec![(0.0, 2.0)]);
    }

    #[test]
    fn chord_note_after_a_rest_falls_back_to_the_cursor() {
        let mut stray = pitched("E", 4, None, 2);
        stray.chord = true;
        let (raw, spans) = run(&[measure(1, None, vec![rest(3), stray, pitched("D", 4, None, 2)])]);
        let beats: Vec<(String, f64)> = raw
            .notes
            .iter()
            .map(|n| (n.pitch.to_string(), n.beat))
            .collect();
        // No note emitted yet: the chord sits on the cursor and does not move it.
        assert_eq!(beats, vec![("E4".to_string(), 1.5), ("D4".to_string(), 1.5)]);
        assert_eq!(spans, vec![(0.0, 2.5)]);
    }

    #[test]
    fn chord_note_after_a_rest_reuses_the_last_emitted_note() {
        let mut late = pitched("G", 4, None, 2);
        late.chord = true;
        let (raw, _) = run(&[
            measure(1, None, vec![pitched("C", 4, None, 4)]),
            measure(2, None, vec![rest(2), late]),
        ]);
        assert_eq!(raw.notes[1].beat, 0.0);
        assert_eq!(raw.notes[1].measure, 2);
    }

    #[test]
    fn measure_accidentals_reset_at_the_barline() {
        let (raw, _) = run(&[
            measure(
                1,
                Some(2),
                vec![pitched("F", 4, Some(0.0), 2), pitched("F", 4, None, 2), pitched("C", 5, None, 2)],
            ),
            measure(2, None, vec![pitched("F", 4, None, 2)]),
        ]);
        let spelled: Vec<String> = raw.notes.iter().map(|n| n.pitch.to_string()).collect();
        assert_eq!(spelled, vec!["F4", "F4", "C#5", "F#4"]);
        assert_eq!(raw.notes[0].pitch.accidental, Accidental::Natural);
    }

    #[test]
    fn lyrics_anchor_to_their_note_beat() {
        let mut sung = pitched("A", 4, None, 2);
        sung.lyrics.push(Lyric {
            number: 1,
            text: "la".to_string(),
            syllabic: Some("single".to_string()),
        });
        let (raw, _) = run(&[measure(3, None, vec![rest(3), sung])]);
        assert_eq!(raw.lyrics.len(), 1);
        assert_eq!(raw.lyrics[0].beat, 1.5);
        assert_eq!(raw.lyrics[0].text, "la");
        assert_eq!(raw.lyrics[0].measure, 3);
    }

    #[test]
    fn notes_missing_required_fields_are_skipped() {
        let no_duration = Note {
            duration: None,
            ..pitched("C", 4, None, 0)
        };
        let bad_step = pitched("H", 4, None, 2);
        let (raw, spans) = run(&[measure(1, None, vec![no_duration, bad_step, pitched("D", 4, None, 2)])]);
        assert_eq!(raw.notes.len(), 1);
        assert_eq!(raw.notes[0].beat, 0.0);
        assert_eq!(spans, vec![(0.0, 1.0)]);
    }

    #[test]
    fn off_grid_positions_are_snapped() {
        // Triplet eighths with 3 divisions per quarter.
        let measures = vec![Measure {
            attributes: vec![Attributes {
                divisions: Some(3),
                ..Default::default()
            }],
            ..measure(1, None, vec![pitched("C", 4, None, 1), pitched("D", 4, None, 1), pitched("E", 4, None, 1)])
        }];
        let (raw, _) = run(&measures);
        let beats: Vec<f64> = raw.notes.iter().map(|n| n.beat).collect();
        assert_eq!(beats, vec![0.0, 0.5, 0.5]);
    }
}
