//! Configuration settings for Mosaic.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub source: SourceSettings,
    pub ingestion: IngestionSettings,
    pub transcription: TranscriptionSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub vector_store: VectorStoreSettings,
    pub rag: RagSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for per-file scratch media.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.mosaic".to_string(),
            temp_dir: "/tmp/mosaic".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// File source provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceProvider {
    /// A directory on the local filesystem.
    #[default]
    Local,
    /// Google Drive, using an externally issued access token.
    Drive,
}

impl std::str::FromStr for SourceProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "fs" => Ok(SourceProvider::Local),
            "drive" | "gdrive" => Ok(SourceProvider::Drive),
            _ => Err(format!("Unknown source provider: {}", s)),
        }
    }
}

impl std::fmt::Display for SourceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceProvider::Local => write!(f, "local"),
            SourceProvider::Drive => write!(f, "drive"),
        }
    }
}

/// Where source files come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Source provider (local, drive).
    pub provider: SourceProvider,
    /// Root directory for the local provider.
    pub local_root: String,
    /// Drive v3 API base URL.
    pub drive_api_base: String,
    /// Environment variable holding the Drive access token.
    pub drive_token_env: String,
    /// Default folder to populate from (Drive folder ID or local subdirectory).
    pub default_folder: Option<String>,
    /// Retries for transient download failures.
    pub fetch_retries: u32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            provider: SourceProvider::Local,
            local_root: ".".to_string(),
            drive_api_base: "https://www.googleapis.com/drive/v3/".to_string(),
            drive_token_env: "GOOGLE_DRIVE_TOKEN".to_string(),
            default_folder: None,
            fetch_retries: 3,
        }
    }
}

/// Per-stage time limits, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTimeouts {
    pub download_seconds: u64,
    pub extraction_seconds: u64,
    pub decode_seconds: u64,
    pub denoise_seconds: u64,
    pub transcription_seconds: u64,
    pub embedding_seconds: u64,
    pub store_seconds: u64,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            download_seconds: 300,
            extraction_seconds: 120,
            decode_seconds: 600,
            denoise_seconds: 300,
            transcription_seconds: 900,
            embedding_seconds: 120,
            store_seconds: 60,
        }
    }
}

impl StageTimeouts {
    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_seconds)
    }

    pub fn extraction(&self) -> Duration {
        Duration::from_secs(self.extraction_seconds)
    }

    pub fn decode(&self) -> Duration {
        Duration::from_secs(self.decode_seconds)
    }

    pub fn denoise(&self) -> Duration {
        Duration::from_secs(self.denoise_seconds)
    }

    pub fn transcription(&self) -> Duration {
        Duration::from_secs(self.transcription_seconds)
    }

    pub fn embedding(&self) -> Duration {
        Duration::from_secs(self.embedding_seconds)
    }

    pub fn store(&self) -> Duration {
        Duration::from_secs(self.store_seconds)
    }
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Files processed concurrently during bulk population (1 = sequential).
    pub max_concurrent_files: usize,
    /// Apply spectral noise reduction to normalized audio.
    pub denoise: bool,
    /// Noise floor passed to the denoiser, in dB.
    pub noise_floor_db: f32,
    /// Seconds of footage between sampled video frames.
    pub frame_interval_seconds: f64,
    /// Per-stage time limits.
    pub timeouts: StageTimeouts,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            max_concurrent_files: 2,
            denoise: true,
            noise_floor_db: -25.0,
            frame_interval_seconds: 5.0,
            timeouts: StageTimeouts::default(),
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Optional language hint (ISO-639-1).
    pub language: Option<String>,
    /// Longest audio segment sent in one recognition request.
    pub segment_seconds: u32,
    /// Maximum concurrent segment requests.
    pub max_concurrent_segments: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: None,
            // 600s of 16 kHz mono PCM16 is ~19 MB, under the Whisper upload limit.
            segment_seconds: 600,
            max_concurrent_segments: 3,
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Jina CLIP, shared text/image vector space (default).
    #[default]
    Jina,
    /// OpenAI text embeddings.
    OpenAI,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jina" => Ok(EmbeddingProvider::Jina),
            "openai" => Ok(EmbeddingProvider::OpenAI),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::Jina => write!(f, "jina"),
            EmbeddingProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (jina, openai).
    pub provider: EmbeddingProvider,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// API base URL for the Jina provider.
    pub api_base: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Jina,
            model: "jina-clip-v2".to_string(),
            dimensions: 1024,
            api_base: "https://api.jina.ai/v1/embeddings".to_string(),
        }
    }
}

/// Text chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Window size in characters.
    pub size: usize,
    /// Characters shared between consecutive windows.
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 200,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.mosaic/vectors.db".to_string(),
        }
    }
}

/// RAG (Retrieval-Augmented Generation) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for response generation.
    pub model: String,
    /// Number of hits requested from similarity search.
    pub top_k: usize,
    /// Minimum similarity score for a hit to be used.
    pub score_threshold: f32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_output_tokens: u32,
    /// Time limit for query embedding and similarity search.
    pub retrieval_timeout_seconds: u64,
    /// Time limit for answer generation.
    pub generation_timeout_seconds: u64,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            top_k: 5,
            score_threshold: 0.6,
            temperature: 0.5,
            max_output_tokens: 1024,
            retrieval_timeout_seconds: 60,
            generation_timeout_seconds: 120,
        }
    }
}

impl RagSettings {
    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval_timeout_seconds)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_seconds)
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::MosaicError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mosaic")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Get the expanded local source root.
    pub fn local_root(&self) -> PathBuf {
        Self::expand_path(&self.source.local_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let settings = Settings::default();
        assert_eq!(settings.chunking.size, 1000);
        assert_eq!(settings.chunking.overlap, 200);
        assert_eq!(settings.rag.top_k, 5);
        assert!((settings.rag.score_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(settings.ingestion.frame_interval_seconds, 5.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [source]
            provider = "drive"

            [chunking]
            size = 500
            "#,
        )
        .unwrap();

        assert_eq!(settings.source.provider, SourceProvider::Drive);
        assert_eq!(settings.chunking.size, 500);
        assert_eq!(settings.chunking.overlap, 200);
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Jina);
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.ingestion.max_concurrent_files = 4;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.ingestion.max_concurrent_files, 4);
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("GDrive".parse::<SourceProvider>().unwrap(), SourceProvider::Drive);
        assert_eq!("openai".parse::<EmbeddingProvider>().unwrap(), EmbeddingProvider::OpenAI);
        assert!("s3".parse::<SourceProvider>().is_err());
    }
}
