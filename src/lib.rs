//! scoretimeline: flatten a MusicXML score into a beat-ordered timeline.
//!
//! Supports both uncompressed MusicXML (.musicxml) and compressed MXL (.mxl)
//! files. The result is one part's notes, rests and lyrics dated in beats
//! on a half-beat grid, with repeats, voltas and time-signature changes
//! anchored to 0-based measures.
//!
//! # Example
//! ```no_run
//! use scoretimeline::{timeline_from_file, timeline_to_typescript, TimelineOptions};
//!
//! let timeline = timeline_from_file("path/to/song.mxl", &TimelineOptions::default()).unwrap();
//! println!("Notes: {}", timeline.summary.total_notes);
//! println!("{}", timeline_to_typescript(&timeline));
//! ```

pub mod accumulator;
pub mod beat;
pub mod emit;
pub mod error;
pub mod model;
pub mod mxl;
pub mod parser;
pub mod pitch;
pub mod structure;
pub mod ties;
pub mod timeline;
pub mod walker;

use std::path::Path;

pub use beat::snap_to_half_beat;
pub use emit::{timeline_to_json, timeline_to_typescript};
pub use error::{Result, ScoreError};
pub use model::*;
pub use mxl::parse_mxl;
pub use parser::parse_musicxml;
pub use pitch::{Accidental, KeySignature, SpelledPitch, Step};
pub use timeline::{build_timeline, Timeline, TimelineEvent, TimelineOptions};

/// Parse a MusicXML file from a file path.
/// Automatically detects format based on file extension:
/// - `.musicxml` or `.xml` → uncompressed MusicXML
/// - `.mxl` → compressed MXL (ZIP archive)
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Score> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| ScoreError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_bytes(&data, path.extension().and_then(|e| e.to_str()))
}

/// Parse MusicXML from raw bytes with an optional format hint.
/// If `extension` is None, tries to auto-detect the format.
pub fn parse_bytes(data: &[u8], extension: Option<&str>) -> Result<Score> {
    match extension {
        Some("mxl") => parse_mxl(data),
        Some("musicxml") | Some("xml") => parse_musicxml(std::str::from_utf8(data)?),
        _ => {
            // Auto-detect: try as XML first, then as MXL
            if let Ok(xml) = std::str::from_utf8(data) {
                if xml.trim_start().starts_with('<') {
                    return parse_musicxml(xml);
                }
            }
            parse_mxl(data)
        }
    }
}

/// Parse a score file and build its timeline.
pub fn timeline_from_file<P: AsRef<Path>>(path: P, options: &TimelineOptions) -> Result<Timeline> {
    let score = parse_file(path)?;
    build_timeline(&score, options)
}

/// Parse score bytes and build their timeline.
pub fn timeline_from_bytes(
    data: &[u8],
    extension: Option<&str>,
    options: &TimelineOptions,
) -> Result<Timeline> {
    let score = parse_bytes(data, extension)?;
    build_timeline(&score, options)
}
