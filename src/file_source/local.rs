//! Local directory file source.
//!
//! File ids are paths relative to the root, with `/` separators.

use super::{FileSource, RemoteFile};
use crate::error::{MosaicError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub struct LocalFileSource {
    root: PathBuf,
}

impl LocalFileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an id under the root, refusing anything that would escape it.
    fn resolve(&self, file_id: &str) -> Result<PathBuf> {
        let relative = Path::new(file_id);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if file_id.is_empty() || escapes {
            return Err(MosaicError::InvalidInput(format!(
                "file id must be a path inside the source root: {}",
                file_id
            )));
        }
        Ok(self.root.join(relative))
    }

    fn to_remote(&self, path: &Path) -> Option<RemoteFile> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let name = path.file_name()?.to_string_lossy().to_string();
        Some(RemoteFile::new(id, name))
    }
}

#[async_trait]
impl FileSource for LocalFileSource {
    fn provider(&self) -> &'static str {
        "local"
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        let path = self.resolve(file_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MosaicError::FileNotFound(file_id.to_string()))
            }
            Err(e) => Err(MosaicError::FetchFailure(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn list(
        &self,
        name_filter: Option<&str>,
        folder_id: Option<&str>,
    ) -> Result<Vec<RemoteFile>> {
        let dir = match folder_id {
            Some(folder) => self.resolve(folder)?,
            None => self.root.clone(),
        };
        if !dir.is_dir() {
            return Err(MosaicError::FileNotFound(dir.display().to_string()));
        }

        let needle = name_filter.map(str::to_lowercase);
        let root = self.root.clone();
        let source = LocalFileSource::new(root);

        let files = tokio::task::spawn_blocking(move || {
            let mut files = Vec::new();
            for entry in WalkDir::new(&dir).sort_by_file_name() {
                let entry = entry.map_err(|e| MosaicError::FetchFailure(e.to_string()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(file) = source.to_remote(entry.path()) else {
                    continue;
                };
                if let Some(needle) = &needle {
                    if !file.name.to_lowercase().contains(needle.as_str()) {
                        continue;
                    }
                }
                files.push(file);
            }
            Ok::<_, MosaicError>(files)
        })
        .await
        .map_err(|e| MosaicError::FetchFailure(format!("directory walk aborted: {}", e)))??;

        debug!(count = files.len(), "Listed local files");
        Ok(files)
    }

    async fn describe(&self, file_id: &str) -> Result<RemoteFile> {
        let path = self.resolve(file_id)?;
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(MosaicError::FileNotFound(file_id.to_string()));
        }
        self.to_remote(&path)
            .ok_or_else(|| MosaicError::FileNotFound(file_id.to_string()))
    }
}
