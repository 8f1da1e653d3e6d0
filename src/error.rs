//! Error types for score loading and timeline construction.
//!
//! Only structurally malformed input is fatal. Missing optional fields,
//! unmatched ties and unclosed voltas degrade locally and never surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreError {
    /// The score file could not be read
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed XML
    #[error("XML parse error: {0}")]
    Xml(String),

    /// Well-formed XML, but not a document we can navigate
    #[error("unsupported root element '{0}': only 'score-partwise' is supported")]
    UnsupportedFormat(String),

    /// The .mxl container could not be opened or has no MusicXML root file
    #[error("MXL archive error: {0}")]
    Archive(String),

    #[error("invalid UTF-8 in MusicXML: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// The requested part index does not exist in the score
    #[error("part {index} not found (score has {count} parts)")]
    PartNotFound { index: usize, count: usize },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScoreError>;
