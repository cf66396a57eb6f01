//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::create_embedder;
use crate::rag::{Query, Retriever};
use crate::vector_store::create_vector_store;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    limit: usize,
    min_score: Option<f32>,
    settings: Settings,
) -> Result<()> {
    preflight::check(Operation::Search, &settings).await?;

    let query = Query::new(query, limit)?;
    let retriever = Retriever::new(
        create_vector_store(&settings)?,
        create_embedder(&settings.embedding)?,
    )
    .with_score_threshold(min_score.unwrap_or(settings.rag.score_threshold))
    .with_timeout(settings.rag.retrieval_timeout());

    let spinner = Output::spinner("Searching...");
    let results = retriever.retrieve_relevant(&query).await;
    spinner.finish_and_clear();

    match results {
        Ok(result) => {
            if result.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!(
                    "Found {} results ({} text, {} images)",
                    result.hits.len(),
                    result.text_documents.len(),
                    result.images.len()
                ));

                for hit in &result.hits {
                    Output::search_result(
                        &hit.document.source_name,
                        hit.document.sequence_index,
                        hit.score,
                        &hit.document.content,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
