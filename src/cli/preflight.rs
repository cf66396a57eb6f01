//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and credentials are available before starting
//! operations that would otherwise fail midway through a batch.

use crate::config::{EmbeddingProvider, Settings, SourceProvider};
use crate::embedding::JINA_API_KEY_ENV;
use crate::error::{MosaicError, Result};
use crate::media::tools_available;

const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion needs media tools, the source, transcription and embeddings.
    Ingest,
    /// Asking needs embeddings and generation.
    Ask,
    /// Search needs embeddings.
    Search,
}

/// Run pre-flight checks for the given operation.
pub async fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ingest => {
            for (tool, present) in tools_available().await {
                if !present {
                    return Err(MosaicError::ToolNotFound(tool.to_string()));
                }
            }
            if settings.source.provider == SourceProvider::Drive {
                check_env(&settings.source.drive_token_env)?;
            }
            check_env(OPENAI_API_KEY_ENV)?;
            check_embedding_key(settings)?;
        }
        Operation::Ask => {
            check_env(OPENAI_API_KEY_ENV)?;
            check_embedding_key(settings)?;
        }
        Operation::Search => {
            check_embedding_key(settings)?;
        }
    }
    Ok(())
}

fn check_embedding_key(settings: &Settings) -> Result<()> {
    match settings.embedding.provider {
        EmbeddingProvider::Jina => check_env(JINA_API_KEY_ENV),
        EmbeddingProvider::OpenAI => check_env(OPENAI_API_KEY_ENV),
    }
}

/// Check that an environment variable holds a non-empty value.
fn check_env(name: &str) -> Result<()> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(()),
        Ok(_) => Err(MosaicError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            name, name
        ))),
        Err(_) => Err(MosaicError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            name, name
        ))),
    }
}
