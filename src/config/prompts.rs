//! Prompt templates for Mosaic.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder regex"))
}

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for grounded answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: String,
    pub user: String,
    /// Context used when retrieval found no text documents.
    pub empty_context: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI assistant using Retrieval-Augmented Generation (RAG).
Your role is to give accurate, concise, and well-structured answers grounded in retrieved documents.

## Core Rules
1. Grounding: Use the retrieved documents as the main source, and the attached images when present. Quote, summarize, or synthesize fairly.
2. Reasoning: Be logical and structured. If the context is incomplete, acknowledge the gaps and only add reliable general knowledge.
3. Transparency: If you are unsure or the context is insufficient, say so. Use phrases like "Based on the retrieved documents...". Never invent facts or citations.
4. Style: Polite, professional and clear. Use plain language and structure long answers with bullets or steps.
5. Guardrails: Avoid harmful or biased content. Stay on topic."#
                .to_string(),

            user: "Question: {{question}}\n\nRelevant context from documents:\n{{context}}"
                .to_string(),

            empty_context: "No relevant documents found.".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is single pass: placeholders inside substituted values are left
    /// alone, and unknown placeholders stay in the output.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        placeholder()
            .replace_all(template, |caps: &regex::Captures<'_>| {
                vars.get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.rag.system.contains("Never invent"));
        assert_eq!(prompts.rag.empty_context, "No relevant documents found.");
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_substituted_values_not_rescanned() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "literal {{question}}".to_string());
        vars.insert("question".to_string(), "why?".to_string());

        let result = Prompts::render("{{question}} | {{context}} | {{missing}}", &vars);
        assert_eq!(result, "why? | literal {{question}} | {{missing}}");
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut custom = HashMap::new();
        custom.insert("question".to_string(), "from config".to_string());
        custom.insert("team".to_string(), "infra".to_string());
        let prompts = Prompts::load(None, Some(&custom)).unwrap();

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "from caller".to_string());

        let rendered = prompts.render_with_custom("{{question}} / {{team}}", &vars);
        assert_eq!(rendered, "from caller / infra");
    }

    #[test]
    fn test_custom_rag_prompts_loaded_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rag.toml"),
            "system = \"Answer tersely.\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.rag.system, "Answer tersely.");
        // Unspecified fields keep their defaults.
        assert_eq!(prompts.rag.empty_context, "No relevant documents found.");
    }
}
