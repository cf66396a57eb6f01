//! Jina CLIP embeddings (shared text/image vector space).

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::content::image::{image_data, is_encoded_image};
use crate::error::{MosaicError, Result};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Environment variable holding the Jina API key.
pub const JINA_API_KEY_ENV: &str = "JINA_API_KEY";

const BATCH_SIZE: usize = 32;
const MAX_RETRIES: usize = 3;

/// One input item: text, or an image as base64.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum JinaInput<'a> {
    Text(&'a str),
    Image(&'a str),
}

#[derive(Debug, Serialize)]
struct JinaRequest<'a> {
    model: &'a str,
    dimensions: usize,
    normalized: bool,
    input: Vec<JinaInput<'a>>,
}

#[derive(Debug, Deserialize)]
struct JinaEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct JinaResponse {
    data: Vec<JinaEmbedding>,
}

#[derive(Debug)]
enum CallError {
    Transient(String),
    Permanent(String),
}

impl CallError {
    fn into_message(self) -> String {
        match self {
            CallError::Transient(m) | CallError::Permanent(m) => m,
        }
    }
}

fn to_input(payload: &str) -> JinaInput<'_> {
    if is_encoded_image(payload) {
        JinaInput::Image(image_data(payload))
    } else {
        JinaInput::Text(payload)
    }
}

/// Jina embeddings API client. Encoded images are sent as image inputs.
pub struct JinaEmbedder {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl JinaEmbedder {
    pub fn new(api_base: &str, api_key: &str, model: &str, dimensions: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| MosaicError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimensions,
        })
    }

    /// Build from settings, reading the key from `JINA_API_KEY`.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        let api_key = std::env::var(JINA_API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                MosaicError::Config(format!("{} not set", JINA_API_KEY_ENV))
            })?;
        Self::new(
            &settings.api_base,
            &api_key,
            &settings.model,
            settings.dimensions as usize,
        )
    }

    async fn call(&self, chunk: &[String]) -> std::result::Result<Vec<Vec<f32>>, CallError> {
        let body = JinaRequest {
            model: &self.model,
            dimensions: self.dimensions,
            normalized: true,
            input: chunk.iter().map(|p| to_input(p)).collect(),
        };

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::Transient(format!("request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(CallError::Transient(format!("Jina API returned {}", status)));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CallError::Permanent(format!(
                "Jina API error {}: {}",
                status, text
            )));
        }

        let mut parsed: JinaResponse = response
            .json()
            .await
            .map_err(|e| CallError::Permanent(format!("invalid Jina response: {}", e)))?;
        if parsed.data.len() != chunk.len() {
            return Err(CallError::Permanent(format!(
                "expected {} embeddings, got {}",
                chunk.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for JinaEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MosaicError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let embeddings = (|| self.call(chunk))
                .retry(
                    ExponentialBuilder::default()
                        .with_max_times(MAX_RETRIES)
                        .with_min_delay(Duration::from_millis(500)),
                )
                .when(|e| matches!(e, CallError::Transient(_)))
                .notify(|err, dur| warn!("Jina embedding failed, retrying in {:?}: {:?}", dur, err))
                .await
                .map_err(|e| MosaicError::Embedding(e.into_message()))?;
            all.extend(embeddings);
        }

        debug!("Generated {} embeddings", all.len());
        Ok(all)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
