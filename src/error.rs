//! Error types for Mosaic.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Library-level error type for Mosaic operations.
#[derive(Error, Debug)]
pub enum MosaicError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Fetch failed: {0}")]
    FetchFailure(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Media decode failed: {0}")]
    DecodeFailure(String),

    #[error("Speech could not be recognized")]
    TranscriptionUnintelligible,

    #[error("Transcription service failed: {0}")]
    TranscriptionService(String),

    #[error("Video {part} extraction failed: {message}")]
    PartialVideoFailure { part: String, message: String },

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Store write failed: {0}")]
    StoreWrite(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("{stage} timed out after {seconds}s")]
    Timeout { stage: &'static str, seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Mosaic operations.
pub type Result<T> = std::result::Result<T, MosaicError>;

/// Run `fut` with a deadline; an elapsed deadline becomes [`MosaicError::Timeout`].
pub async fn within<T, F>(stage: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(MosaicError::Timeout {
            stage,
            seconds: limit.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_within_passes_result_through() {
        let value = within("noop", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(tokio_test::assert_ok!(value), 7);

        let failed: Result<()> = within("noop", Duration::from_secs(1), async {
            Err(MosaicError::InvalidInput("bad".into()))
        })
        .await;
        tokio_test::assert_err!(failed);
    }

    #[tokio::test]
    async fn test_within_reports_stage_on_timeout() {
        let result: Result<()> = within("download", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(MosaicError::Timeout { stage, .. }) => assert_eq!(stage, "download"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
