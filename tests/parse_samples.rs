//! Integration tests: parse the sample files in the sheetmusic/ directory.

use scoretimeline::{parse_bytes, parse_file, EndingType, RepeatDirection, Score, ScoreError};
use std::io::{Cursor, Write};
use std::path::PathBuf;

/// Get the path to the sheetmusic directory.
fn sheetmusic_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("sheetmusic")
}

fn sample_xml() -> String {
    std::fs::read_to_string(sheetmusic_dir().join("ode-fragment.musicxml"))
        .expect("Failed to read ode-fragment.musicxml")
}

/// Pack a MusicXML string into an .mxl archive the way notation programs do.
fn pack_mxl(xml: &str) -> Vec<u8> {
    let container = r#"<?xml version="1.0" encoding="UTF-8"?>
<container><rootfiles><rootfile full-path="ode-fragment.xml" media-type="application/vnd.recordare.musicxml+xml"/></rootfiles></container>"#;
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    writer.start_file("META-INF/container.xml", options).unwrap();
    writer.write_all(container.as_bytes()).unwrap();
    writer.start_file("ode-fragment.xml", options).unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

// ─── Uncompressed MusicXML (.musicxml) ──────────────────────────────

#[test]
fn parse_ode_fragment_musicxml() {
    let path = sheetmusic_dir().join("ode-fragment.musicxml");
    let score = parse_file(&path).expect("Failed to parse ode-fragment.musicxml");

    assert_score_ode_fragment(&score);
}

fn assert_score_ode_fragment(score: &Score) {
    // Metadata
    assert_eq!(score.title.as_deref(), Some("Ode Fragment"));
    assert_eq!(score.composer.as_deref(), Some("Traditional"));
    assert_eq!(score.version.as_deref(), Some("3.1"));

    // Parts
    assert_eq!(score.parts.len(), 2);
    let part = &score.parts[0];
    assert_eq!(part.id, "P1");
    assert_eq!(part.name, "Melody");
    assert_eq!(part.measures.len(), 10);
    assert_eq!(score.parts[1].name, "Bass");

    // First measure attributes
    let attrs = &part.measures[0].attributes[0];
    assert_eq!(attrs.divisions, Some(2));
    assert_eq!(attrs.key.as_ref().map(|k| k.fifths), Some(2));
    let time = attrs.time.expect("Should have time signature");
    assert_eq!((time.beats, time.beat_type), (3, 4));

    // Tie chain spans measures 2 and 3
    let m2 = &part.measures[1];
    assert!(m2.notes[0].rest);
    assert!(m2.notes[1].tie_start && !m2.notes[1].tie_stop);
    assert!(m2.notes[2].tie_start && m2.notes[2].tie_stop);
    let m3 = &part.measures[2];
    assert!(m3.notes[0].tie_stop && !m3.notes[0].tie_start);
    assert_eq!(m3.notes.iter().filter(|n| n.chord).count(), 2);

    // Barlines
    assert_eq!(part.measures[4].barlines[0].repeat, Some(RepeatDirection::Forward));
    assert_eq!(part.measures[8].barlines[0].repeat, Some(RepeatDirection::Backward));
    let ending = part.measures[9].barlines[0].ending.as_ref().expect("volta");
    assert_eq!(ending.number, "1");
    assert_eq!(ending.ending_type, EndingType::Start);
}

// ─── Compressed MXL (.mxl) ──────────────────────────────────────────

#[test]
fn parse_ode_fragment_mxl() {
    let data = pack_mxl(&sample_xml());
    let score = parse_bytes(&data, Some("mxl")).expect("Failed to parse packed MXL");
    assert_score_ode_fragment(&score);
}

#[test]
fn auto_detects_format_without_extension() {
    let xml = sample_xml();
    let from_text = parse_bytes(xml.as_bytes(), None).expect("XML auto-detect");
    assert_score_ode_fragment(&from_text);

    let from_zip = parse_bytes(&pack_mxl(&xml), None).expect("MXL auto-detect");
    assert_score_ode_fragment(&from_zip);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = parse_file(sheetmusic_dir().join("no-such-song.musicxml")).unwrap_err();
    assert!(matches!(err, ScoreError::Io { .. }), "unexpected error: {err}");
}

#[test]
fn truncated_document_is_fatal() {
    let xml = sample_xml();
    let truncated = &xml[..xml.len() / 2];
    let err = parse_bytes(truncated.as_bytes(), Some("musicxml")).unwrap_err();
    assert!(matches!(err, ScoreError::Xml(_)), "unexpected error: {err}");
}
