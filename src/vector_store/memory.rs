//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{
    cosine_similarity, summarize_sources, Document, IndexedSource, SearchResult, VectorStore,
};
use crate::content::ContentKind;
use crate::error::{MosaicError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory vector store.
pub struct MemoryVectorStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Document>>> {
        self.documents
            .read()
            .map_err(|e| MosaicError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Document>>> {
        self.documents
            .write()
            .map_err(|e| MosaicError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, doc: &Document) -> Result<()> {
        self.write()?.insert(doc.id.to_string(), doc.clone());
        Ok(())
    }

    async fn upsert_batch(&self, docs: &[Document]) -> Result<usize> {
        let mut store = self.write()?;
        for doc in docs {
            store.insert(doc.id.to_string(), doc.clone());
        }
        Ok(docs.len())
    }

    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let docs = self.read()?;

        let mut results: Vec<SearchResult> = docs
            .values()
            .map(|doc| {
                let score = cosine_similarity(query_embedding, &doc.embedding);
                SearchResult {
                    document: doc.clone(),
                    score,
                }
            })
            .filter(|r| r.score >= min_score)
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn is_source_indexed(&self, source_file_id: &str) -> Result<bool> {
        Ok(self
            .read()?
            .values()
            .any(|doc| doc.source_file_id == source_file_id))
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        Ok(summarize_sources(self.read()?.values()))
    }

    async fn get_by_source_id(&self, source_file_id: &str) -> Result<Vec<Document>> {
        let mut result: Vec<Document> = self
            .read()?
            .values()
            .filter(|doc| doc.source_file_id == source_file_id)
            .cloned()
            .collect();

        result.sort_by_key(|doc| (doc.kind == ContentKind::Image, doc.sequence_index));
        Ok(result)
    }

    async fn document_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::tests::doc;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryVectorStore::new();

        store
            .upsert(&doc("notes", ContentKind::Text, 0, vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();
        store
            .upsert_batch(&[
                doc("clip", ContentKind::Image, 1, vec![0.0, 1.0, 0.0]),
                doc("clip", ContentKind::Text, 0, vec![0.7, 0.7, 0.0]),
                doc("clip", ContentKind::Image, 0, vec![0.0, 0.0, 1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.document_count().await.unwrap(), 4);
        assert!(store.is_source_indexed("clip").await.unwrap());
        assert!(!store.is_source_indexed("other").await.unwrap());

        let results = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.source_file_id, "notes");
        assert!(results[0].score >= results[1].score);

        let clip = store.get_by_source_id("clip").await.unwrap();
        let order: Vec<(ContentKind, u32)> =
            clip.iter().map(|d| (d.kind, d.sequence_index)).collect();
        assert_eq!(
            order,
            vec![
                (ContentKind::Text, 0),
                (ContentKind::Image, 0),
                (ContentKind::Image, 1)
            ]
        );
    }

    #[tokio::test]
    async fn test_threshold_excludes_low_scores() {
        let store = MemoryVectorStore::new();
        store
            .upsert_batch(&[
                doc("a", ContentKind::Text, 0, vec![1.0, 0.0]),
                doc("b", ContentKind::Text, 0, vec![0.5, 0.5]),
                doc("c", ContentKind::Text, 0, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let results = store
            .search_with_threshold(&[1.0, 0.0], 10, 0.6)
            .await
            .unwrap();

        // a scores 1.0, b ~0.707, c 0.0
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.score >= 0.6));
    }
}
