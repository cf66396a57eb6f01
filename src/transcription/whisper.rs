//! OpenAI Whisper speech recognizer.

use super::{RecognitionError, SpeechRecognizer};
use crate::config::TranscriptionSettings;
use crate::error::Result;
use crate::openai::create_client;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Whisper-based [`SpeechRecognizer`].
pub struct WhisperRecognizer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
}

impl WhisperRecognizer {
    /// Create a recognizer with the default model and no language hint.
    pub fn new() -> Result<Self> {
        Self::with_config(&TranscriptionSettings::default())
    }

    pub fn with_config(settings: &TranscriptionSettings) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.model.clone(),
            language: settings.language.clone(),
        })
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperRecognizer {
    #[instrument(skip_all, fields(model = %self.model, bytes = wav.len()))]
    async fn recognize(&self, wav: &[u8]) -> std::result::Result<String, RecognitionError> {
        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8("audio.wav".to_string(), wav.to_vec()))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| RecognitionError::Service(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| RecognitionError::Service(format!("Whisper API error: {}", e)))?;

        let text = response.text.trim();
        debug!(
            chars = text.len(),
            segments = response.segments.as_ref().map(|s| s.len()).unwrap_or(0),
            "Whisper response"
        );

        if text.is_empty() {
            return Err(RecognitionError::Unintelligible);
        }
        Ok(text.to_string())
    }
}
