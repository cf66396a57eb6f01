//! Grounded answer generation.

use super::{Query, Retriever, RetrievalResult};
use crate::config::{Prompts, RagSettings};
use crate::content::image::{image_data, image_mime_type};
use crate::error::{within, MosaicError, Result};
use crate::generation::{Generator, PromptBlock, PromptMessage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Answer plus the retrieval it was grounded on.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub answer: String,
    pub retrieval: RetrievalResult,
}

/// Retrieval followed by a single generator call.
pub struct RagEngine {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    generation_timeout: Duration,
}

impl RagEngine {
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
            prompts: Prompts::default(),
            generation_timeout: Duration::from_secs(120),
        }
    }

    /// Apply thresholds and timeouts from settings.
    pub fn from_settings(
        retriever: Retriever,
        generator: Arc<dyn Generator>,
        settings: &RagSettings,
    ) -> Self {
        let retriever = retriever
            .with_score_threshold(settings.score_threshold)
            .with_timeout(settings.retrieval_timeout());
        Self {
            generation_timeout: settings.generation_timeout(),
            ..Self::new(retriever, generator)
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Build the system and user messages for a question.
    pub fn build_messages(&self, question: &str, retrieval: &RetrievalResult) -> Vec<PromptMessage> {
        let context = if retrieval.text_documents.is_empty() {
            self.prompts.rag.empty_context.clone()
        } else {
            retrieval.text_documents.join("\n\n")
        };

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context);
        let user_text = self.prompts.render_with_custom(&self.prompts.rag.user, &vars);

        let mut blocks = vec![PromptBlock::Text(user_text)];
        blocks.extend(retrieval.images.iter().map(|image| PromptBlock::Image {
            data: image_data(image).to_string(),
            mime_type: image_mime_type(image),
        }));

        vec![
            PromptMessage::system(self.prompts.rag.system.clone()),
            PromptMessage::user(blocks),
        ]
    }

    /// Retrieve context and generate an answer, returning both.
    #[instrument(skip(self, query), fields(top_k = query.top_k))]
    pub async fn ask(&self, query: &Query) -> Result<RagAnswer> {
        info!("Processing question: {}", query.text);

        let retrieval = self.retriever.retrieve_relevant(query).await?;
        let messages = self.build_messages(&query.text, &retrieval);

        let answer = match within(
            "generation",
            self.generation_timeout,
            self.generator.invoke(&messages),
        )
        .await
        {
            Ok(answer) => answer,
            Err(e @ (MosaicError::Timeout { .. } | MosaicError::Generation(_))) => return Err(e),
            Err(e) => return Err(MosaicError::Generation(e.to_string())),
        };

        debug!(
            "Generated answer from {} text and {} image hits",
            retrieval.text_documents.len(),
            retrieval.images.len()
        );
        Ok(RagAnswer { answer, retrieval })
    }

    /// Generate an answer for a query.
    pub async fn generate_answer(&self, query: &Query) -> Result<String> {
        Ok(self.ask(query).await?.answer)
    }
}
