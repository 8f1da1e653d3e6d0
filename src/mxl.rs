//! MXL file handler: reads compressed MusicXML (.mxl) archives.
//!
//! An .mxl file is a ZIP archive containing:
//!   - META-INF/container.xml  : declares the root MusicXML file path
//!   - <rootfile>.xml          : the actual MusicXML content (e.g., score.xml)
//!   - (optional) other files  : images, sounds, etc.

use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::error::{Result, ScoreError};
use crate::model::Score;
use crate::parser;

/// Read and parse a .mxl file from raw bytes.
pub fn parse_mxl(data: &[u8]) -> Result<Score> {
    let xml = extract_musicxml_from_mxl(data)?;
    parser::parse_musicxml(&xml)
}

/// Extract the MusicXML content string from .mxl bytes.
pub fn extract_musicxml_from_mxl(data: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| ScoreError::Archive(format!("failed to open archive: {e}")))?;

    let root_file_path = locate_root_file(&mut archive)?;
    log::debug!("reading MusicXML root file '{root_file_path}' from archive");

    let mut root_file = archive.by_name(&root_file_path).map_err(|e| {
        ScoreError::Archive(format!("root file '{root_file_path}' not found: {e}"))
    })?;

    let mut bytes = Vec::new();
    root_file
        .read_to_end(&mut bytes)
        .map_err(|e| ScoreError::Archive(format!("failed to read '{root_file_path}': {e}")))?;

    String::from_utf8(bytes).map_err(|e| ScoreError::Encoding(e.utf8_error()))
}

/// Find the root MusicXML file: container.xml first, then `score.xml`,
/// then any other .xml/.musicxml entry outside META-INF.
fn locate_root_file(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<String> {
    let container_xml = match archive.by_name("META-INF/container.xml") {
        Ok(mut container_file) => {
            let mut xml = String::new();
            container_file
                .read_to_string(&mut xml)
                .map_err(|e| ScoreError::Archive(format!("failed to read container.xml: {e}")))?;
            Some(xml)
        }
        Err(_) => None,
    }; // mutable borrow of archive is released here

    if let Some(xml) = container_xml {
        let doc = roxmltree::Document::parse(&xml)
            .map_err(|e| ScoreError::Archive(format!("failed to parse container.xml: {e}")))?;

        return doc
            .descendants()
            .filter(|n| n.tag_name().name() == "rootfile")
            .find_map(|n| n.attribute("full-path"))
            .map(String::from)
            .ok_or_else(|| ScoreError::Archive("no rootfile in container.xml".to_string()));
    }

    let names: Vec<String> = archive.file_names().map(String::from).collect();

    if names.iter().any(|n| n == "score.xml") {
        return Ok("score.xml".to_string());
    }

    names
        .iter()
        .find(|name| {
            !name.starts_with("META-INF/")
                && name.as_str() != "container.xml"
                && (name.ends_with(".xml") || name.ends_with(".musicxml"))
        })
        .cloned()
        .ok_or_else(|| {
            ScoreError::Archive(format!("no MusicXML file found in archive. Files: {names:?}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const SCORE: &str = r#"<score-partwise version="4.0"><part-list><score-part id="P1"/></part-list><part id="P1"><measure number="1"/></part></score-partwise>"#;

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, body) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn follows_container_rootfile() {
        let container = r#"<container><rootfiles><rootfile full-path="music/tune.musicxml"/></rootfiles></container>"#;
        let data = archive(&[
            ("META-INF/container.xml", container),
            ("music/tune.musicxml", SCORE),
        ]);
        let score = parse_mxl(&data).unwrap();
        assert_eq!(score.version.as_deref(), Some("4.0"));
        assert_eq!(score.measure_count(), 1);
    }

    #[test]
    fn falls_back_to_score_xml_without_container() {
        let data = archive(&[("other.xml", "<not-a-score/>"), ("score.xml", SCORE)]);
        assert_eq!(extract_musicxml_from_mxl(&data).unwrap(), SCORE);
    }

    #[test]
    fn rejects_non_zip_and_empty_archives() {
        assert!(matches!(parse_mxl(b"not a zip"), Err(ScoreError::Archive(_))));
        let data = archive(&[("readme.txt", "hello")]);
        assert!(matches!(parse_mxl(&data), Err(ScoreError::Archive(_))));
    }
}
