//! Extension-based routing of source files.

use crate::extract::DocumentFormat;
use serde::Serialize;

/// Processing chain a file is sent through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Document(DocumentFormat),
    Image,
    Audio,
    Video,
    Unsupported,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Document(_) => "document",
            Route::Image => "image",
            Route::Audio => "audio",
            Route::Video => "video",
            Route::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Document(format) => write!(f, "document ({})", format),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Pick the route for a file extension.
///
/// `extension` may carry a leading dot and any case. During bulk population
/// (`populate_db`) PDF documents are not accepted.
pub fn dispatch(extension: &str, populate_db: bool) -> Route {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();

    match ext.as_str() {
        "png" | "jpg" | "jpeg" | "svg" => Route::Image,
        "mp4" | "mov" | "avi" | "mkv" => Route::Video,
        "mp3" | "wav" | "flac" | "aac" => Route::Audio,
        "txt" => Route::Document(DocumentFormat::PlainText),
        "docx" => Route::Document(DocumentFormat::Docx),
        "pdf" if !populate_db => Route::Document(DocumentFormat::Pdf),
        _ => Route::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_table() {
        for ext in [".png", ".jpg", ".jpeg", ".svg"] {
            assert_eq!(dispatch(ext, false), Route::Image, "{}", ext);
        }
        for ext in [".mp4", ".mov", ".avi", ".mkv"] {
            assert_eq!(dispatch(ext, false), Route::Video, "{}", ext);
        }
        for ext in [".mp3", ".wav", ".flac", ".aac"] {
            assert_eq!(dispatch(ext, false), Route::Audio, "{}", ext);
        }
        assert_eq!(
            dispatch(".txt", false),
            Route::Document(DocumentFormat::PlainText)
        );
        assert_eq!(dispatch(".docx", true), Route::Document(DocumentFormat::Docx));
    }

    #[test]
    fn test_case_insensitive_and_dotless() {
        assert_eq!(dispatch(".PNG", false), Route::Image);
        assert_eq!(dispatch("Mp4", true), Route::Video);
    }

    #[test]
    fn test_unknown_extensions_unsupported() {
        assert_eq!(dispatch(".zip", false), Route::Unsupported);
        assert_eq!(dispatch("", false), Route::Unsupported);
        assert_eq!(dispatch(".gif", false), Route::Unsupported);
    }

    #[test]
    fn test_pdf_only_outside_populate() {
        assert_eq!(dispatch(".pdf", false), Route::Document(DocumentFormat::Pdf));
        assert_eq!(dispatch(".pdf", true), Route::Unsupported);
    }
}
