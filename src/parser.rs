//! MusicXML parser: converts MusicXML XML into the Score data model.

use roxmltree::{Document, Node};

use crate::error::{Result, ScoreError};
use crate::model::*;

/// Parse a MusicXML XML string into a Score.
pub fn parse_musicxml(xml: &str) -> Result<Score> {
    // MusicXML files include a DOCTYPE declaration, so we must allow DTDs
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = Document::parse_with_options(xml, options)
        .map_err(|e| ScoreError::Xml(e.to_string()))?;
    let root = doc.root_element();

    if root.tag_name().name() != "score-partwise" {
        return Err(ScoreError::UnsupportedFormat(
            root.tag_name().name().to_string(),
        ));
    }

    let mut score = Score::new();
    score.version = root.attribute("version").map(String::from);

    for child in root.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "work" => parse_work(&child, &mut score),
            "identification" => parse_identification(&child, &mut score),
            "part-list" => parse_part_list(&child, &mut score),
            "part" => parse_part(&child, &mut score),
            _ => {}
        }
    }

    Ok(score)
}

// ─── Work / Identification ───────────────────────────────────────────

fn parse_work(node: &Node, score: &mut Score) {
    if let Some(title) = child_text(node, "work-title") {
        score.title = Some(title);
    }
}

fn parse_identification(node: &Node, score: &mut Score) {
    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "creator" && child.attribute("type") == Some("composer") {
            score.composer = child.text().map(|t| t.trim().to_string());
        }
    }
}

// ─── Part List ───────────────────────────────────────────────────────

fn parse_part_list(node: &Node, score: &mut Score) {
    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "score-part" {
            let id = child.attribute("id").unwrap_or("").to_string();
            let name = child_text(&child, "part-name").unwrap_or_default();
            score.parts.push(Part {
                id,
                name,
                measures: Vec::new(),
            });
        }
    }
}

// ─── Part (measures) ─────────────────────────────────────────────────

fn parse_part(node: &Node, score: &mut Score) {
    let part_id = node.attribute("id").unwrap_or("").to_string();

    // A <part> missing from the part-list still carries music; keep it.
    let index = match score.parts.iter().position(|p| p.id == part_id) {
        Some(i) => i,
        None => {
            log::warn!("part '{part_id}' is not declared in <part-list>");
            score.parts.push(Part {
                id: part_id.clone(),
                name: part_id,
                measures: Vec::new(),
            });
            score.parts.len() - 1
        }
    };
    let part = &mut score.parts[index];

    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "measure" {
            let previous = part.measures.last().map(|m| m.number);
            part.measures.push(parse_measure(&child, previous));
        }
    }
}

// ─── Measure ─────────────────────────────────────────────────────────

fn parse_measure(node: &Node, previous_number: Option<i32>) -> Measure {
    let fallback = previous_number.map_or(1, |n| n + 1);
    let number = match node.attribute("number") {
        Some(raw) => raw.trim().parse::<i32>().unwrap_or_else(|_| {
            log::warn!("measure number '{raw}' is not an integer; using {fallback}");
            fallback
        }),
        None => fallback,
    };
    let mut measure = Measure {
        number,
        attributes: Vec::new(),
        notes: Vec::new(),
        barlines: Vec::new(),
    };

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "attributes" => measure.attributes.push(parse_attributes(&child)),
            "note" => measure.notes.push(parse_note(&child)),
            "barline" => measure.barlines.push(parse_barline(&child)),
            _ => {}
        }
    }

    measure
}

// ─── Attributes ──────────────────────────────────────────────────────

fn parse_attributes(node: &Node) -> Attributes {
    let mut attrs = Attributes::default();

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "divisions" => attrs.divisions = parse_i32(&child),
            "key" => attrs.key = parse_key(&child),
            "time" => attrs.time = parse_time(&child),
            _ => {}
        }
    }

    attrs
}

fn parse_key(node: &Node) -> Option<Key> {
    let fifths = node
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "fifths")
        .and_then(|n| parse_i32(&n))?;
    Some(Key { fifths })
}

fn parse_time(node: &Node) -> Option<TimeSignature> {
    let mut beats = None;
    let mut beat_type = None;
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "beats" => beats = parse_i32(&child),
            "beat-type" => beat_type = parse_i32(&child),
            _ => {}
        }
    }
    Some(TimeSignature {
        beats: beats?,
        beat_type: beat_type?,
    })
}

// ─── Note ────────────────────────────────────────────────────────────

fn parse_note(node: &Node) -> Note {
    let mut note = Note::default();

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "pitch" => note.pitch = Some(parse_pitch(&child)),
            "duration" => note.duration = parse_i32(&child),
            "rest" => note.rest = true,
            "chord" => note.chord = true,
            // A note can carry both: it ends one tie and starts the next.
            "tie" => match child.attribute("type") {
                Some("start") => note.tie_start = true,
                Some("stop") => note.tie_stop = true,
                _ => {}
            },
            "lyric" => {
                if let Some(lyric) = parse_lyric(&child) {
                    note.lyrics.push(lyric);
                }
            }
            _ => {}
        }
    }

    note
}

fn parse_pitch(node: &Node) -> Pitch {
    let mut pitch = Pitch {
        step: String::new(),
        octave: None,
        alter: None,
    };
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "step" => pitch.step = child.text().unwrap_or("").trim().to_string(),
            "octave" => pitch.octave = parse_i32(&child),
            "alter" => pitch.alter = parse_f64(&child),
            _ => {}
        }
    }
    pitch
}

fn parse_lyric(node: &Node) -> Option<Lyric> {
    let number = node
        .attribute("number")
        .and_then(|n| n.parse().ok())
        .unwrap_or(1);
    let mut text = String::new();
    let mut syllabic = None;
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "text" => {
                // Elided syllables carry several <text> elements; keep the first.
                if text.is_empty() {
                    text = child.text().unwrap_or("").to_string();
                }
            }
            "syllabic" => syllabic = child.text().map(|t| t.trim().to_string()),
            _ => {}
        }
    }
    if text.is_empty() {
        return None;
    }
    Some(Lyric {
        number,
        text,
        syllabic,
    })
}

// ─── Barline ─────────────────────────────────────────────────────────

fn parse_barline(node: &Node) -> Barline {
    let location = node.attribute("location").unwrap_or("right").to_string();
    let mut barline = Barline {
        location,
        repeat: None,
        ending: None,
    };

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "repeat" => {
                barline.repeat = match child.attribute("direction") {
                    Some("backward") => Some(RepeatDirection::Backward),
                    Some("forward") => Some(RepeatDirection::Forward),
                    other => {
                        log::warn!("ignoring repeat with direction {other:?}");
                        None
                    }
                };
            }
            "ending" => {
                let number = child.attribute("number").unwrap_or("1").to_string();
                let ending_type = match child.attribute("type") {
                    Some("stop") => EndingType::Stop,
                    Some("discontinue") => EndingType::Discontinue,
                    _ => EndingType::Start,
                };
                barline.ending = Some(Ending {
                    number,
                    ending_type,
                });
            }
            _ => {}
        }
    }

    barline
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn child_text(node: &Node, name: &str) -> Option<String> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
}

fn parse_i32(node: &Node) -> Option<i32> {
    let text = node.text()?.trim();
    // Some writers emit integral values as "2.0"
    text.parse()
        .ok()
        .or_else(|| text.parse::<f64>().ok().map(|v| v as i32))
}

fn parse_f64(node: &Node) -> Option<f64> {
    node.text()?.trim().parse().ok()
}
