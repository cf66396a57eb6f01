//! Google Drive v3 file source.
//!
//! Uses an access token issued elsewhere; acquiring or refreshing it is the
//! caller's business.

use super::{FileSource, RemoteFile};
use crate::config::SourceSettings;
use crate::error::{MosaicError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";
const FILE_FIELDS: &str = "id,name,mimeType";
const PAGE_SIZE: &str = "1000";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: Option<String>,
}

impl From<DriveFile> for RemoteFile {
    fn from(file: DriveFile) -> Self {
        RemoteFile {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

pub struct DriveFileSource {
    client: reqwest::Client,
    api_base: Url,
    token: String,
}

impl DriveFileSource {
    pub fn new(api_base: &str, token: impl Into<String>) -> Result<Self> {
        let mut api_base = Url::parse(api_base)
            .map_err(|e| MosaicError::Config(format!("Invalid Drive API base '{}': {}", api_base, e)))?;
        // Url::join drops the last path segment unless the base ends in a slash.
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_base,
            token: token.into(),
        })
    }

    /// Build from settings, reading the token from the configured env var.
    pub fn from_settings(settings: &SourceSettings) -> Result<Self> {
        let token = std::env::var(&settings.drive_token_env)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                MosaicError::Config(format!(
                    "Drive access token not set; export {}",
                    settings.drive_token_env
                ))
            })?;
        Self::new(&settings.drive_api_base, token)
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.api_base
            .join(path)
            .map_err(|e| MosaicError::Config(format!("Invalid Drive URL: {}", e)))
    }

    fn file_url(&self, file_id: &str) -> Result<Url> {
        let mut url = self.url("files/")?;
        url.path_segments_mut()
            .map_err(|_| MosaicError::Config("Drive API base cannot be a base URL".into()))?
            .pop_if_empty()
            .push(file_id);
        Ok(url)
    }

    async fn get(&self, url: Url, file_id: Option<&str>) -> Result<reqwest::Response> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| MosaicError::FetchFailure(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = file_id {
                return Err(MosaicError::FileNotFound(id.to_string()));
            }
        }

        let body = resp.text().await.unwrap_or_default();
        Err(MosaicError::FetchFailure(format!(
            "Drive API returned {}: {}",
            status,
            body.trim()
        )))
    }
}

/// Quote a value for a Drive query string literal.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Drive `q` expression for the listing filters.
pub fn build_query(name_filter: Option<&str>, folder_id: Option<&str>) -> String {
    let mut clauses = vec!["trashed = false".to_string()];
    if let Some(name) = name_filter.filter(|n| !n.is_empty()) {
        clauses.push(format!("name contains {}", quote(name)));
    }
    if let Some(folder) = folder_id.filter(|f| !f.is_empty()) {
        clauses.push(format!("{} in parents", quote(folder)));
    }
    clauses.join(" and ")
}

#[async_trait]
impl FileSource for DriveFileSource {
    fn provider(&self) -> &'static str {
        "drive"
    }

    #[instrument(skip(self))]
    async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        let mut url = self.file_url(file_id)?;
        url.query_pairs_mut().append_pair("alt", "media");

        let resp = self.get(url, Some(file_id)).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| MosaicError::FetchFailure(e.to_string()))?;

        debug!(bytes = bytes.len(), "Downloaded from Drive");
        Ok(bytes.to_vec())
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        name_filter: Option<&str>,
        folder_id: Option<&str>,
    ) -> Result<Vec<RemoteFile>> {
        let query = build_query(name_filter, folder_id);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.url("files")?;
            {
                let mut pairs = url.query_pairs_mut();
                pairs
                    .append_pair("q", &query)
                    .append_pair("fields", LIST_FIELDS)
                    .append_pair("pageSize", PAGE_SIZE);
                if let Some(token) = &page_token {
                    pairs.append_pair("pageToken", token);
                }
            }

            let page: FileList = self
                .get(url, None)
                .await?
                .json()
                .await
                .map_err(|e| MosaicError::FetchFailure(format!("Invalid Drive listing: {}", e)))?;

            files.extend(page.files.into_iter().map(RemoteFile::from));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = files.len(), "Listed Drive files");
        Ok(files)
    }

    async fn describe(&self, file_id: &str) -> Result<RemoteFile> {
        let mut url = self.file_url(file_id)?;
        url.query_pairs_mut().append_pair("fields", FILE_FIELDS);

        let file: DriveFile = self
            .get(url, Some(file_id))
            .await?
            .json()
            .await
            .map_err(|e| MosaicError::FetchFailure(format!("Invalid Drive metadata: {}", e)))?;
        Ok(file.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_without_filters() {
        assert_eq!(build_query(None, None), "trashed = false");
        assert_eq!(build_query(Some(""), Some("")), "trashed = false");
    }

    #[test]
    fn test_query_with_filters() {
        assert_eq!(
            build_query(Some("report"), Some("folder123")),
            "trashed = false and name contains 'report' and 'folder123' in parents"
        );
    }

    #[test]
    fn test_query_escapes_quotes() {
        assert_eq!(
            build_query(Some("Bob's \\ notes"), None),
            r"trashed = false and name contains 'Bob\'s \\ notes'"
        );
    }

    #[test]
    fn test_file_urls() {
        let source = DriveFileSource::new("https://www.googleapis.com/drive/v3", "t").unwrap();

        assert_eq!(
            source.file_url("abc/def").unwrap().as_str(),
            "https://www.googleapis.com/drive/v3/files/abc%2Fdef"
        );
        assert_eq!(
            source.url("files").unwrap().as_str(),
            "https://www.googleapis.com/drive/v3/files"
        );
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let settings = SourceSettings {
            drive_token_env: "MOSAIC_TEST_UNSET_DRIVE_TOKEN".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            DriveFileSource::from_settings(&settings),
            Err(MosaicError::Config(_))
        ));
    }

    #[test]
    fn test_listing_deserializes() {
        let page: FileList = serde_json::from_str(
            r#"{"files":[{"id":"1","name":"a.txt","mimeType":"text/plain"}],"nextPageToken":"p2"}"#,
        )
        .unwrap();
        assert_eq!(page.files.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("p2"));
        let file: RemoteFile = page.files.into_iter().next().unwrap().into();
        assert_eq!(file.mime_type.as_deref(), Some("text/plain"));
    }
}
