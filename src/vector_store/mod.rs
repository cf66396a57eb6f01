//! Vector store abstraction for Mosaic.
//!
//! Provides a trait-based interface for different vector database backends.
//! Documents are append-only from the pipeline's point of view.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::config::VectorStoreSettings;
use crate::content::{ContentKind, ContentUnit};
use crate::error::{MosaicError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One stored content unit with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID.
    pub id: Uuid,
    /// Source file this unit came from.
    pub source_file_id: String,
    /// Display name of the source file.
    pub source_name: String,
    pub kind: ContentKind,
    /// Text chunk or data-URI encoded image.
    pub content: String,
    /// Chunk or frame ordinal within the source file.
    pub sequence_index: u32,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this document was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Document {
    /// Wrap a content unit and its embedding for storage.
    pub fn from_unit(unit: ContentUnit, source_name: &str, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_file_id: unit.source_file_id,
            source_name: source_name.to_string(),
            kind: unit.kind,
            content: unit.payload,
            sequence_index: unit.sequence_index,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched document.
    pub document: Document,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Summary information about an indexed source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    pub source_file_id: String,
    pub source_name: String,
    pub text_units: u32,
    pub image_units: u32,
    /// Most recent write for this source.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store a document with its embedding.
    async fn upsert(&self, doc: &Document) -> Result<()>;

    /// Store several documents atomically.
    async fn upsert_batch(&self, docs: &[Document]) -> Result<usize>;

    /// Search for similar documents.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(query_embedding, limit, f32::MIN).await
    }

    /// Search with a minimum similarity threshold, best first.
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Check if any unit of a source file is stored.
    async fn is_source_indexed(&self, source_file_id: &str) -> Result<bool>;

    /// List all indexed source files, most recent first.
    async fn list_sources(&self) -> Result<Vec<IndexedSource>>;

    /// Get all documents for a source file, text before images, in sequence order.
    async fn get_by_source_id(&self, source_file_id: &str) -> Result<Vec<Document>>;

    /// Get total document count.
    async fn document_count(&self) -> Result<usize>;
}

/// Build the configured vector store.
pub fn create_vector_store(settings: &crate::config::Settings) -> Result<Arc<dyn VectorStore>> {
    create_vector_store_from(&settings.vector_store, &settings.sqlite_path())
}

fn create_vector_store_from(
    settings: &VectorStoreSettings,
    sqlite_path: &std::path::Path,
) -> Result<Arc<dyn VectorStore>> {
    match settings.provider.to_lowercase().as_str() {
        "sqlite" => Ok(Arc::new(SqliteVectorStore::new(sqlite_path)?)),
        "memory" => Ok(Arc::new(MemoryVectorStore::new())),
        other => Err(MosaicError::Config(format!(
            "Unknown vector store provider: {}",
            other
        ))),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Fold documents into per-source summaries, most recent first.
pub(crate) fn summarize_sources<'a>(docs: impl Iterator<Item = &'a Document>) -> Vec<IndexedSource> {
    let mut by_source: std::collections::HashMap<&str, IndexedSource> =
        std::collections::HashMap::new();

    for doc in docs {
        let entry = by_source
            .entry(doc.source_file_id.as_str())
            .or_insert_with(|| IndexedSource {
                source_file_id: doc.source_file_id.clone(),
                source_name: doc.source_name.clone(),
                text_units: 0,
                image_units: 0,
                indexed_at: doc.indexed_at,
            });
        match doc.kind {
            ContentKind::Text => entry.text_units += 1,
            ContentKind::Image => entry.image_units += 1,
        }
        if doc.indexed_at > entry.indexed_at {
            entry.indexed_at = doc.indexed_at;
        }
    }

    let mut sources: Vec<IndexedSource> = by_source.into_values().collect();
    sources.sort_by(|a, b| {
        b.indexed_at
            .cmp(&a.indexed_at)
            .then_with(|| a.source_file_id.cmp(&b.source_file_id))
    });
    sources
}
