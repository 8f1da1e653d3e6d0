//! Extract repeat barlines, volta brackets and time-signature changes
//! from the walk. Measures here are the source's 1-based numbers.

use crate::beat::snap_to_half_beat;
use crate::model::{EndingType, RepeatDirection, TimeSignature};
use crate::walker::WalkedMeasure;

/// A repeat barline, anchored to the beat its measure starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatObservation {
    pub measure: i32,
    pub direction: RepeatDirection,
    pub beat: f64,
    /// Barline location ("left", "right", "middle")
    pub location: String,
}

/// An alternate-ending bracket.
#[derive(Debug, Clone, PartialEq)]
pub struct VoltaSpan {
    /// Lowest ending number the bracket is played on
    pub number: u32,
    /// Ending number(s) as written, e.g. "1, 2"
    pub label: String,
    pub start_measure: i32,
    pub end_measure: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSignatureObservation {
    pub measure: i32,
    pub time: TimeSignature,
}

/// Structural annotations for a whole part.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    pub repeats: Vec<RepeatObservation>,
    /// Ordered by ending number, then start measure
    pub voltas: Vec<VoltaSpan>,
    pub time_changes: Vec<TimeSignatureObservation>,
}

#[derive(Debug, Default)]
pub struct StructuralExtractor {
    out: Structure,
    /// Brackets opened and not yet closed, each with its parsed numbers
    open: Vec<(usize, Vec<u32>)>,
}

impl StructuralExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, walked: &WalkedMeasure) {
        let number = walked.number();

        // The first measure establishes the signature; it is not a change.
        if walked.index > 0 && walked.time_changed() {
            log::info!("measure {number}: time signature change to {}", walked.state.time);
            self.out.time_changes.push(TimeSignatureObservation {
                measure: number,
                time: walked.state.time,
            });
        }

        for barline in walked.barlines() {
            if let Some(direction) = barline.repeat {
                let beat = snap_to_half_beat(walked.start_beat);
                log::info!("measure {number}: repeat {} (beat {beat})", direction.as_str());
                self.out.repeats.push(RepeatObservation {
                    measure: number,
                    direction,
                    beat,
                    location: barline.location.clone(),
                });
            }

            if let Some(ref ending) = barline.ending {
                log::info!("measure {number}: volta {} {:?}", ending.number, ending.ending_type);
                let numbers = parse_ending_numbers(&ending.number);
                match ending.ending_type {
                    EndingType::Start => self.open_bracket(number, &ending.number, numbers),
                    EndingType::Stop | EndingType::Discontinue => {
                        self.close_bracket(number, &numbers)
                    }
                }
            }
        }
    }

    fn open_bracket(&mut self, measure: i32, label: &str, numbers: Vec<u32>) {
        self.out.voltas.push(VoltaSpan {
            number: numbers.iter().copied().min().unwrap_or(1),
            label: label.to_string(),
            start_measure: measure,
            // Stays a single-measure bracket if it is never closed.
            end_measure: measure,
        });
        self.open.push((self.out.voltas.len() - 1, numbers));
    }

    /// Close the most recently opened bracket sharing an ending number.
    fn close_bracket(&mut self, measure: i32, numbers: &[u32]) {
        let found = self
            .open
            .iter()
            .rposition(|(_, open_numbers)| open_numbers.iter().any(|n| numbers.contains(n)));
        match found {
            Some(pos) => {
                let (index, _) = self.open.remove(pos);
                self.out.voltas[index].end_measure = measure;
            }
            None => log::warn!("measure {measure}: volta end {numbers:?} has no open bracket"),
        }
    }

    pub fn finish(mut self) -> Structure {
        for (index, _) in &self.open {
            let volta = &self.out.voltas[*index];
            log::warn!(
                "volta {} opened at measure {} is never closed",
                volta.label,
                volta.start_measure
            );
        }
        self.out
            .voltas
            .sort_by_key(|v| (v.number, v.start_measure));
        self.out
    }
}

/// Parse ending number string like "1", "2", "1, 2", or "1-3" into numbers.
/// Supports comma-separated values and dash-separated ranges (e.g. "1-3" → [1,2,3]).
pub fn parse_ending_numbers(s: &str) -> Vec<u32> {
    let mut result = Vec::new();
    for part in s.split(|c: char| c == ',' || c == ' ') {
        let part = part.trim_end_matches('.').trim();
        if part.is_empty() {
            continue;
        }
        if let Some((start, end)) = part.split_once('-') {
            if let (Ok(start), Ok(end)) = (start.parse::<u32>(), end.parse::<u32>()) {
                result.extend(start..=end);
                continue;
            }
        }
        if let Ok(n) = part.parse::<u32>() {
            result.push(n);
        }
    }
    // Unparsable labels still open a bracket for the first pass.
    if result.is_empty() {
        result.push(1);
    }
    result
}
