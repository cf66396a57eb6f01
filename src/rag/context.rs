//! Query-time retrieval.

use super::{partition_hits, Query, RetrievalResult};
use crate::embedding::Embedder;
use crate::error::{within, MosaicError, Result};
use crate::vector_store::VectorStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Embeds a query, searches the store and partitions the hits.
pub struct Retriever {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    score_threshold: f32,
    timeout: Duration,
}

impl Retriever {
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            score_threshold: 0.6,
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the minimum similarity score a hit needs.
    pub fn with_score_threshold(mut self, score_threshold: f32) -> Self {
        self.score_threshold = score_threshold;
        self
    }

    /// Bound embedding plus search.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn score_threshold(&self) -> f32 {
        self.score_threshold
    }

    #[instrument(skip(self, query), fields(top_k = query.top_k))]
    pub async fn retrieve_relevant(&self, query: &Query) -> Result<RetrievalResult> {
        let result = within("retrieval", self.timeout, async {
            let embedding = self.embedder.embed(&query.text).await?;
            self.vector_store
                .search_with_threshold(&embedding, query.top_k, self.score_threshold)
                .await
        })
        .await;

        let mut hits = match result {
            Ok(hits) => hits,
            Err(e @ MosaicError::Timeout { .. }) => return Err(e),
            Err(e) => return Err(MosaicError::Retrieval(e.to_string())),
        };

        // Stores may treat the threshold loosely.
        hits.retain(|h| h.score >= self.score_threshold);
        hits.truncate(query.top_k);

        let result = partition_hits(hits);
        debug!(
            texts = result.text_documents.len(),
            images = result.images.len(),
            "Retrieved context"
        );
        Ok(result)
    }
}
