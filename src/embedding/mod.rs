//! Embedding generation for semantic search and retrieval.
//!
//! Text chunks and encoded images go through the same [`Embedder`] call; an
//! image's data-URI payload is handed over as-is and the provider decides how to
//! treat it.

mod jina;
mod openai;

pub use jina::{JinaEmbedder, JINA_API_KEY_ENV};
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProvider, EmbeddingSettings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Default OpenAI model when the configured model belongs to another provider.
const OPENAI_FALLBACK_MODEL: &str = "text-embedding-3-small";

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single payload.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple payloads, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Build the configured embedder.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.provider {
        EmbeddingProvider::Jina => Ok(Arc::new(JinaEmbedder::from_settings(settings)?)),
        EmbeddingProvider::OpenAI => {
            let model = if settings.model.starts_with("jina") {
                OPENAI_FALLBACK_MODEL
            } else {
                settings.model.as_str()
            };
            Ok(Arc::new(OpenAIEmbedder::with_config(
                model,
                settings.dimensions as usize,
            )?))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Deterministic embedder: pinned vectors for known payloads, a byte-derived
    /// vector for everything else.
    pub(crate) struct StubEmbedder {
        dims: usize,
        pinned: HashMap<String, Vec<f32>>,
        text_only: bool,
    }

    impl StubEmbedder {
        pub(crate) fn new(dims: usize) -> Self {
            Self {
                dims,
                pinned: HashMap::new(),
                text_only: false,
            }
        }

        /// Refuse any batch holding an encoded image.
        pub(crate) fn text_only(mut self) -> Self {
            self.text_only = true;
            self
        }

        pub(crate) fn pin(mut self, payload: &str, embedding: Vec<f32>) -> Self {
            self.pinned.insert(payload.to_string(), embedding);
            self
        }

        fn vector_for(&self, payload: &str) -> Vec<f32> {
            if let Some(v) = self.pinned.get(payload) {
                return v.clone();
            }
            let seed: usize = payload.bytes().map(usize::from).sum();
            (0..self.dims)
                .map(|i| ((seed + i * 31) % 17) as f32 + 1.0)
                .collect()
        }
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(self.vector_for(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if self.text_only && texts.iter().any(|t| crate::content::is_encoded_image(t)) {
                return Err(crate::error::MosaicError::Embedding(
                    "image inputs are not supported".to_string(),
                ));
            }
            Ok(texts.iter().map(|t| self.vector_for(t)).collect())
        }

        fn dimensions(&self) -> usize {
            self.dims
        }
    }

    #[tokio::test]
    async fn test_stub_is_deterministic() {
        let embedder = StubEmbedder::new(4).pin("query", vec![1.0, 0.0, 0.0, 0.0]);

        assert_eq!(embedder.embed("query").await.unwrap(), vec![1.0, 0.0, 0.0, 0.0]);
        let batch = embedder
            .embed_batch(&["a".to_string(), "a".to_string()])
            .await
            .unwrap();
        assert_eq!(batch[0], batch[1]);
        assert_eq!(batch[0].len(), 4);
    }
}
