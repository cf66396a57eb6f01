//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::Query;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, top_k: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings).await {
        Output::error(&format!("{}", e));
        Output::info("Run 'mosaic doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let query = Query::new(question, top_k.unwrap_or(settings.rag.top_k))?;
    let orchestrator = Orchestrator::new(settings)?;
    let engine = orchestrator.rag_engine();

    let spinner = Output::spinner("Searching knowledge base...");

    match engine.ask(&query).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.answer);

            if !response.retrieval.is_empty() {
                Output::header("Sources");
                for hit in &response.retrieval.hits {
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
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
