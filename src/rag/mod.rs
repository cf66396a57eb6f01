//! Retrieval and answer assembly.
//!
//! A question is embedded, matched against the store, and the hits are split into
//! text context and images before being handed to the [`Generator`](crate::generation::Generator).

pub mod context;
mod response;

pub use context::Retriever;
pub use response::{RagAnswer, RagEngine};

use crate::content::is_encoded_image;
use crate::error::{MosaicError, Result};
use crate::vector_store::SearchResult;

/// A question plus the number of hits to retrieve.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub text: String,
    pub top_k: usize,
}

impl Query {
    pub fn new(text: impl Into<String>, top_k: usize) -> Result<Self> {
        if top_k == 0 {
            return Err(MosaicError::InvalidInput(
                "top_k must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            text: text.into(),
            top_k,
        })
    }
}

/// Hits split by kind, rank order kept within each list.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub text_documents: Vec<String>,
    /// Data-URI encoded images.
    pub images: Vec<String>,
    /// Ranked hits the partitions were built from.
    pub hits: Vec<SearchResult>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Distinct source names in rank order.
    pub fn sources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for hit in &self.hits {
            let name = hit.document.source_name.as_str();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Split ranked hits into text and image payloads.
pub fn partition_hits(hits: Vec<SearchResult>) -> RetrievalResult {
    let mut text_documents = Vec::new();
    let mut images = Vec::new();

    for hit in &hits {
        let payload = &hit.document.content;
        if is_encoded_image(payload) {
            images.push(payload.clone());
        } else {
            text_documents.push(payload.clone());
        }
    }

    RetrievalResult {
        text_documents,
        images,
        hits,
    }
}
