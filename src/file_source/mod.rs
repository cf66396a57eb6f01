//! File source abstraction for Mosaic.
//!
//! Provides a trait-based interface over the places source files come from
//! (a local directory tree, Google Drive, or an in-memory set for tests).

mod drive;
mod local;
mod memory;

pub use drive::DriveFileSource;
pub use local::LocalFileSource;
pub use memory::MemoryFileSource;

use crate::config::{SourceProvider, SourceSettings};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A file as listed by a [`FileSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub mime_type: Option<String>,
}

impl RemoteFile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let mime_type = mime_for_extension(&extension_of(&name)).map(str::to_string);
        Self {
            id: id.into(),
            name,
            mime_type,
        }
    }
}

/// A file selected for ingestion. Bytes are fetched lazily by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: String,
    /// Display name.
    pub name: String,
    /// Lower-cased with the leading dot, empty when the name has none.
    pub extension: String,
    pub mime_type: Option<String>,
}

impl From<RemoteFile> for SourceFile {
    fn from(file: RemoteFile) -> Self {
        Self {
            id: file.id,
            extension: extension_of(&file.name),
            name: file.name,
            mime_type: file.mime_type,
        }
    }
}

/// Lower-cased extension of `name` including the dot, or `""`.
pub fn extension_of(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < base.len() => base[idx..].to_lowercase(),
        _ => String::new(),
    }
}

/// Best-effort MIME type for a known extension.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension.trim_start_matches('.') {
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        _ => return None,
    };
    Some(mime)
}

/// Trait for file source providers.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Short provider name for logs and status output.
    fn provider(&self) -> &'static str;

    /// Fetch the full content of a file.
    async fn download(&self, file_id: &str) -> Result<Vec<u8>>;

    /// List files, optionally filtered by a name substring and a folder.
    async fn list(
        &self,
        name_filter: Option<&str>,
        folder_id: Option<&str>,
    ) -> Result<Vec<RemoteFile>>;

    /// Look up a single file's metadata.
    async fn describe(&self, file_id: &str) -> Result<RemoteFile>;
}

/// Build the configured file source.
pub fn create_file_source(settings: &SourceSettings) -> Result<Arc<dyn FileSource>> {
    match settings.provider {
        SourceProvider::Local => Ok(Arc::new(LocalFileSource::new(
            crate::config::Settings::expand_path(&settings.local_root),
        ))),
        SourceProvider::Drive => Ok(Arc::new(DriveFileSource::from_settings(settings)?)),
    }
}
