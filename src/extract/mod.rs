//! Text extraction for document files (plain text, DOCX, PDF).
//!
//! Callers hand over the raw bytes and the format chosen by the dispatcher; this module
//! returns plain UTF-8 text or an [`MosaicError::Extraction`].

use crate::error::{MosaicError, Result};
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::debug;

/// Maximum decompressed bytes read from a single ZIP entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const DOCX_BODY: &str = "word/document.xml";

/// Document formats with a text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    PlainText,
    Docx,
    Pdf,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::PlainText => "txt",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract UTF-8 text from document bytes.
///
/// Parsing runs on the blocking pool. A panic inside a parser surfaces as an
/// extraction error instead of tearing down the worker.
pub async fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<String> {
    let owned = bytes.to_vec();
    let text = tokio::task::spawn_blocking(move || extract_sync(&owned, format))
        .await
        .map_err(|e| {
            MosaicError::Extraction(format!("{} parser aborted: {}", format.as_str(), e))
        })??;

    debug!(format = %format, chars = text.chars().count(), "Extracted text");
    Ok(text)
}

fn extract_sync(bytes: &[u8], format: DocumentFormat) -> Result<String> {
    match format {
        DocumentFormat::PlainText => extract_plain(bytes),
        DocumentFormat::Docx => extract_docx(bytes),
        DocumentFormat::Pdf => extract_pdf(bytes),
    }
}

fn extract_plain(bytes: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| MosaicError::Extraction(format!("text is not valid UTF-8: {}", e)))?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| MosaicError::Extraction(format!("PDF extraction failed: {}", e)))
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| MosaicError::Extraction(format!("DOCX is not a ZIP container: {}", e)))?;

    let entry = archive
        .by_name(DOCX_BODY)
        .map_err(|_| MosaicError::Extraction(format!("{} not found", DOCX_BODY)))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| MosaicError::Extraction(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(MosaicError::Extraction(format!(
            "{} exceeds size limit ({} bytes)",
            DOCX_BODY, MAX_XML_ENTRY_BYTES
        )));
    }

    paragraphs_from_wordml(&xml)
}

/// Collect `w:t` runs, one line per `w:p` paragraph.
fn paragraphs_from_wordml(xml: &[u8]) -> Result<String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"tab" => out.push('\t'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| MosaicError::Extraction(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MosaicError::Extraction(format!(
                    "malformed WordprocessingML: {}",
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end_matches('\n').to_string())
}
