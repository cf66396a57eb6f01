//! OpenAI text embeddings.
//!
//! The embedding models are text-only and an image's base64 body runs far past
//! their input limit, so encoded images are refused up front instead of failing
//! the whole batch at the API.

use super::Embedder;
use crate::content::is_encoded_image;
use crate::error::{MosaicError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Inputs per API request.
const REQUEST_SIZE: usize = 100;

pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    pub fn with_config(model: &str, dimensions: usize) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            dimensions,
        })
    }

    fn ensure_text_only(&self, payloads: &[String]) -> Result<()> {
        match payloads.iter().position(|p| is_encoded_image(p)) {
            Some(i) => Err(MosaicError::Embedding(format!(
                "input {} is an encoded image; {} embeds text only (use the jina provider for images)",
                i, self.model
            ))),
            None => Ok(()),
        }
    }

    async fn request(&self, chunk: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(chunk.to_vec()))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| MosaicError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| MosaicError::Embedding(format!("OpenAI embedding API error: {}", e)))?;

        if response.data.len() != chunk.len() {
            return Err(MosaicError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunk.len(),
                response.data.len()
            )));
        }

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| MosaicError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.ensure_text_only(texts)?;

        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(REQUEST_SIZE) {
            all.extend(self.request(chunk).await?);
        }

        debug!("Generated {} embeddings", all.len());
        Ok(all)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
