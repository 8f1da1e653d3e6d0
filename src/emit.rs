//! Projections of a finished [`Timeline`] into output syntaxes.
//!
//! Both are pure functions of the model: JSON for FFI/data exchange, and
//! the TypeScript object-literal fragments the app's song files use.

use std::fmt;

use crate::error::Result;
use crate::timeline::{TimelineEvent, Timeline};

/// Convert a timeline to a pretty-printed JSON string.
pub fn timeline_to_json(timeline: &Timeline) -> Result<String> {
    Ok(serde_json::to_string_pretty(timeline)?)
}

/// Render a timeline as TypeScript array literals. Every id uses the
/// slug the timeline was built with.
pub fn timeline_to_typescript(timeline: &Timeline) -> String {
    TypeScriptLiteral(timeline).to_string()
}

/// Display adapter producing the TypeScript song-data fragment.
pub struct TypeScriptLiteral<'a>(pub &'a Timeline);

const RULE: &str = "// ═══════════════════════════════════════════════════════════════════";

impl fmt::Display for TypeScriptLiteral<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.0;
        writeln!(f, "// Key: {}", t.key.name)?;
        writeln!(f, "// Time: {}/{}", t.time_signature.numerator, t.time_signature.denominator)?;
        writeln!(f, "// Divisions: {}", t.divisions)?;
        writeln!(f)?;

        write_notes(f, &t.events)?;
        writeln!(f)?;
        self.write_repeats(f)?;
        writeln!(f)?;
        self.write_voltas(f)?;
        writeln!(f)?;
        write_time_signature_changes(f, t)?;
        writeln!(f)?;
        write_lyrics(f, t)?;

        if let Some(ref section) = t.repeated_section {
            writeln!(f)?;
            writeln!(f, "{RULE}")?;
            writeln!(
                f,
                "// Repeated section (measures {}-{}):",
                section.start_measure, section.end_measure
            )?;
            writeln!(f, "{RULE}")?;
            write_notes(f, &section.events)?;
        }
        Ok(())
    }
}

impl TypeScriptLiteral<'_> {
    fn write_repeats(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs = &self.0.repeat_pairs;
        if pairs.is_empty() {
            return writeln!(f, "  repeatMarkers: [],");
        }
        let slug = &self.0.slug;
        writeln!(f, "  repeatMarkers: [")?;
        for pair in pairs {
            let n = pair.pair_id;
            if let Some(start) = pair.start_measure {
                writeln!(
                    f,
                    "    {{ id: \"{slug}-repeat-start-{n}\", pairId: \"{slug}-repeat-{n}\", type: \"start\", measureNumber: {start} }},"
                )?;
            }
            writeln!(
                f,
                "    {{ id: \"{slug}-repeat-end-{n}\", pairId: \"{slug}-repeat-{n}\", type: \"end\", measureNumber: {} }},",
                pair.end_measure
            )?;
        }
        writeln!(f, "  ],")
    }

    fn write_voltas(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let voltas = &self.0.voltas;
        if voltas.is_empty() {
            return writeln!(f, "  voltaBrackets: [],");
        }
        writeln!(f, "  voltaBrackets: [")?;
        for (i, volta) in voltas.iter().enumerate() {
            writeln!(
                f,
                "    {{ id: \"{}-volta-{}\", number: {}, startMeasure: {}, endMeasure: {} }},",
                self.0.slug,
                i + 1,
                volta.number,
                volta.start_measure,
                volta.end_measure
            )?;
        }
        writeln!(f, "  ],")
    }
}

fn write_notes(f: &mut fmt::Formatter<'_>, events: &[TimelineEvent]) -> fmt::Result {
    writeln!(f, "  notes: [")?;
    for event in events {
        let pitch = match event {
            TimelineEvent::Note(n) => n.pitch.to_string(),
            TimelineEvent::Rest(_) => "REST".to_string(),
        };
        writeln!(
            f,
            "    {{ id: \"{}\", pitch: \"{pitch}\", duration: {}, absoluteBeat: {} }},",
            event.id(),
            event.duration(),
            event.absolute_beat()
        )?;
    }
    writeln!(f, "  ],")
}

fn write_time_signature_changes(f: &mut fmt::Formatter<'_>, t: &Timeline) -> fmt::Result {
    if t.time_signature_changes.is_empty() {
        return writeln!(f, "  timeSignatureChanges: [],");
    }
    writeln!(f, "  timeSignatureChanges: [")?;
    for change in &t.time_signature_changes {
        let ts = change.time_signature;
        writeln!(
            f,
            "    {{ measureNumber: {}, timeSignature: {{ numerator: {}, denominator: {} }} }},",
            change.measure, ts.numerator, ts.denominator
        )?;
    }
    writeln!(f, "  ],")
}

fn write_lyrics(f: &mut fmt::Formatter<'_>, t: &Timeline) -> fmt::Result {
    if t.lyrics.is_empty() {
        return writeln!(f, "  lyrics: [],");
    }
    writeln!(f, "  lyrics: [")?;
    for lyric in &t.lyrics {
        writeln!(
            f,
            "    {{ text: \"{}\", absoluteBeat: {} }},",
            escape(&lyric.text),
            lyric.absolute_beat
        )?;
    }
    writeln!(f, "  ],")
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_lyric_text() {
        assert_eq!(escape("say \"hi\"\nnow"), "say \\\"hi\\\"\\nnow");
        assert_eq!(escape(r"a\b"), r"a\\b");
    }
}
