//! In-memory file source.
//!
//! Useful for testing and for hosts that already hold the bytes.

use super::{FileSource, RemoteFile};
use crate::error::{MosaicError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryFileSource {
    files: RwLock<BTreeMap<String, (RemoteFile, Vec<u8>)>>,
    /// Remaining simulated transient failures per file id.
    flaky: RwLock<HashMap<String, u32>>,
}

impl MemoryFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file whose id equals its name.
    pub fn with_file(self, name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, name, bytes);
        self
    }

    pub fn insert(&self, id: &str, name: &str, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.write() {
            files.insert(id.to_string(), (RemoteFile::new(id, name), bytes.into()));
        }
    }

    /// Make the next `times` downloads of `id` fail with a retryable error.
    pub fn fail_downloads(&self, id: &str, times: u32) {
        if let Ok(mut flaky) = self.flaky.write() {
            flaky.insert(id.to_string(), times);
        }
    }

    fn poisoned() -> MosaicError {
        MosaicError::FetchFailure("file source lock poisoned".into())
    }
}

#[async_trait]
impl FileSource for MemoryFileSource {
    fn provider(&self) -> &'static str {
        "memory"
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        {
            let mut flaky = self.flaky.write().map_err(|_| Self::poisoned())?;
            if let Some(remaining) = flaky.get_mut(file_id).filter(|n| **n > 0) {
                *remaining -= 1;
                return Err(MosaicError::FetchFailure(format!(
                    "simulated transient failure for {}",
                    file_id
                )));
            }
        }

        let files = self.files.read().map_err(|_| Self::poisoned())?;
        files
            .get(file_id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| MosaicError::FileNotFound(file_id.to_string()))
    }

    async fn list(
        &self,
        name_filter: Option<&str>,
        folder_id: Option<&str>,
    ) -> Result<Vec<RemoteFile>> {
        let files = self.files.read().map_err(|_| Self::poisoned())?;
        let needle = name_filter.map(str::to_lowercase);
        let prefix = folder_id.map(|f| format!("{}/", f.trim_end_matches('/')));

        Ok(files
            .values()
            .map(|(file, _)| file)
            .filter(|f| {
                needle
                    .as_deref()
                    .map_or(true, |n| f.name.to_lowercase().contains(n))
            })
            .filter(|f| prefix.as_deref().map_or(true, |p| f.id.starts_with(p)))
            .cloned()
            .collect())
    }

    async fn describe(&self, file_id: &str) -> Result<RemoteFile> {
        let files = self.files.read().map_err(|_| Self::poisoned())?;
        files
            .get(file_id)
            .map(|(file, _)| file.clone())
            .ok_or_else(|| MosaicError::FileNotFound(file_id.to_string()))
    }
}
