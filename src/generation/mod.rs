//! Answer generation over multimodal prompts.

mod openai;

pub use openai::OpenAIGenerator;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Speaker of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One piece of message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PromptBlock {
    Text(String),
    /// Base64 image body plus its MIME type.
    Image { data: String, mime_type: String },
}

impl PromptBlock {
    /// Render an image block as a `data:` URL.
    pub fn data_url(&self) -> Option<String> {
        match self {
            PromptBlock::Image { data, mime_type } => {
                Some(format!("data:{};base64,{}", mime_type, data))
            }
            PromptBlock::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub blocks: Vec<PromptBlock>,
}

impl PromptMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            blocks: vec![PromptBlock::Text(text.into())],
        }
    }

    pub fn user(blocks: Vec<PromptBlock>) -> Self {
        Self {
            role: Role::User,
            blocks,
        }
    }

    /// Concatenated text blocks, images ignored.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                PromptBlock::Text(t) => Some(t.as_str()),
                PromptBlock::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn image_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, PromptBlock::Image { .. }))
            .count()
    }
}

/// Language model capability.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a completion for the conversation.
    async fn invoke(&self, messages: &[PromptMessage]) -> Result<String>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Generator double returning a fixed answer and recording every prompt.
    pub(crate) struct ScriptedGenerator {
        answer: String,
        calls: Mutex<Vec<Vec<PromptMessage>>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn new(answer: &str) -> Self {
            Self {
                answer: answer.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<Vec<PromptMessage>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn invoke(&self, messages: &[PromptMessage]) -> Result<String> {
            self.calls.lock().unwrap().push(messages.to_vec());
            Ok(self.answer.clone())
        }
    }

    #[test]
    fn test_message_helpers() {
        let msg = PromptMessage::user(vec![
            PromptBlock::Text("Question: hi".into()),
            PromptBlock::Image {
                data: "iVBORw0KGgo=".into(),
                mime_type: "image/png".into(),
            },
        ]);

        assert_eq!(msg.text(), "Question: hi");
        assert_eq!(msg.image_count(), 1);
        assert_eq!(
            msg.blocks[1].data_url().as_deref(),
            Some("data:image/png;base64,iVBORw0KGgo=")
        );
        assert_eq!(PromptMessage::system("rules").role, Role::System);
    }

    #[test]
    fn test_messages_serialize_and_reload() {
        let msg = PromptMessage::user(vec![
            PromptBlock::Text("look".into()),
            PromptBlock::Image {
                data: "eA==".into(),
                mime_type: "image/jpeg".into(),
            },
        ]);

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["blocks"][0], serde_json::json!({"type": "text", "value": "look"}));
        assert_eq!(json["blocks"][1]["value"]["mime_type"], "image/jpeg");

        let back: PromptMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
