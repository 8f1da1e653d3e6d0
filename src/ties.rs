//! Merge tied notes into single sustained notes.

use crate::accumulator::RawNote;
use crate::beat::round_duration;
use crate::pitch::SpelledPitch;

/// A note after tie consolidation. Tie flags are gone; the duration is the
/// whole sounding length, rounded.
#[derive(Debug, Clone, PartialEq)]
pub struct SustainedNote {
    pub pitch: SpelledPitch,
    pub duration: f64,
    pub beat: f64,
    /// Source measure number of the first note in the chain
    pub measure: i32,
}

/// Merge chains of tied notes.
///
/// For each tie-start not already absorbed, scan forward for the nearest
/// tie-stop with the same spelled pitch and absorb its duration. If that
/// note also starts a tie the scan continues from it; the first tie-stop
/// that does not restart ends the chain. A tie-start with no matching stop
/// keeps its own duration.
pub fn consolidate_ties(notes: &[RawNote]) -> Vec<SustainedNote> {
    let mut consumed = vec![false; notes.len()];
    let mut merged = Vec::with_capacity(notes.len());

    for (i, note) in notes.iter().enumerate() {
        if consumed[i] {
            continue;
        }

        let mut duration = note.duration;
        if note.tie_start {
            let mut j = i + 1;
            while j < notes.len() {
                let next = &notes[j];
                if !consumed[j] && next.tie_stop && next.pitch == note.pitch {
                    duration += next.duration;
                    consumed[j] = true;
                    if !next.tie_start {
                        break;
                    }
                }
                j += 1;
            }
        }

        merged.push(SustainedNote {
            pitch: note.pitch,
            duration: round_duration(duration),
            beat: note.beat,
            measure: note.measure,
        });
    }

    let absorbed = notes.len() - merged.len();
    if absorbed > 0 {
        log::debug!("merged {absorbed} tied notes");
    }
    merged
}
