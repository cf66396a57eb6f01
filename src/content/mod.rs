//! Normalized content produced by the ingestion chains.

pub mod image;

pub use image::{encode_image, image_mime_type, image_unit, is_encoded_image};

use serde::{Deserialize, Serialize};

/// Shape of a content unit's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Image,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(ContentKind::Text),
            "image" => Ok(ContentKind::Image),
            _ => Err(format!("Unknown content kind: {}", s)),
        }
    }
}

/// Smallest retrievable piece of normalized content: one text chunk or one image.
///
/// Units are write-once; the orchestrator hands them to the store unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub kind: ContentKind,
    /// UTF-8 text, or a data-URI encoded image.
    pub payload: String,
    pub source_file_id: String,
    /// Chunk or frame ordinal within the source file.
    pub sequence_index: u32,
}

impl ContentUnit {
    pub fn text(source_file_id: &str, sequence_index: u32, payload: String) -> Self {
        Self {
            kind: ContentKind::Text,
            payload,
            source_file_id: source_file_id.to_string(),
            sequence_index,
        }
    }

    pub fn image(source_file_id: &str, sequence_index: u32, payload: String) -> Self {
        Self {
            kind: ContentKind::Image,
            payload,
            source_file_id: source_file_id.to_string(),
            sequence_index,
        }
    }

    /// Wrap text chunks as consecutive text units.
    pub fn from_chunks(source_file_id: &str, chunks: Vec<String>) -> Vec<Self> {
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| Self::text(source_file_id, i as u32, chunk))
            .collect()
    }
}
