//! Configuration module for Mosaic.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingProvider, EmbeddingSettings, GeneralSettings, IngestionSettings,
    PromptSettings, RagSettings, Settings, SourceProvider, SourceSettings, StageTimeouts,
    TranscriptionSettings, VectorStoreSettings,
};
