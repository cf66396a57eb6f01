//! OpenAI chat completions generator.

use super::{Generator, PromptBlock, PromptMessage, Role};
use crate::config::RagSettings;
use crate::error::{MosaicError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
    ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
    ImageUrlArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Chat-completions based [`Generator`]. Image blocks become `image_url` parts.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl OpenAIGenerator {
    pub fn new(settings: &RagSettings) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
        })
    }
}

fn gen_err(e: impl std::fmt::Display) -> MosaicError {
    MosaicError::Generation(e.to_string())
}

fn user_part(block: &PromptBlock) -> Result<ChatCompletionRequestUserMessageContentPart> {
    let part = match block {
        PromptBlock::Text(text) => ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(text.clone())
            .build()
            .map_err(gen_err)?
            .into(),
        PromptBlock::Image { .. } => {
            let url = block.data_url().unwrap_or_default();
            ChatCompletionRequestMessageContentPartImageArgs::default()
                .image_url(
                    ImageUrlArgs::default()
                        .url(url)
                        .detail(ImageDetail::Auto)
                        .build()
                        .map_err(gen_err)?,
                )
                .build()
                .map_err(gen_err)?
                .into()
        }
    };
    Ok(part)
}

fn to_request_message(message: &PromptMessage) -> Result<ChatCompletionRequestMessage> {
    let converted = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.text())
            .build()
            .map_err(gen_err)?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(message.text())
            .build()
            .map_err(gen_err)?
            .into(),
        Role::User => {
            let parts = message
                .blocks
                .iter()
                .map(user_part)
                .collect::<Result<Vec<_>>>()?;
            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(parts))
                .build()
                .map_err(gen_err)?
                .into()
        }
    };
    Ok(converted)
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn invoke(&self, messages: &[PromptMessage]) -> Result<String> {
        let request_messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_output_tokens)
            .build()
            .map_err(gen_err)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| MosaicError::Generation(format!("Failed to generate response: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| MosaicError::Generation("Empty response from LLM".to_string()))?;

        debug!(chars = answer.len(), "Generated answer");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_carries_image_parts() {
        let message = PromptMessage::user(vec![
            PromptBlock::Text("Question: what is shown?".into()),
            PromptBlock::Image {
                data: "iVBORw0KGgo=".into(),
                mime_type: "image/png".into(),
            },
        ]);

        let json = serde_json::to_value(to_request_message(&message).unwrap()).unwrap();

        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(
            json["content"][1]["image_url"]["url"],
            "data:image/png;base64,iVBORw0KGgo="
        );
    }

    #[test]
    fn test_system_message_is_plain_text() {
        let json =
            serde_json::to_value(to_request_message(&PromptMessage::system("rules")).unwrap())
                .unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "rules");
    }
}
