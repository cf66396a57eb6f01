//! Speech-to-text over normalized audio.
//!
//! A [`SpeechRecognizer`] turns one WAV payload into text. The [`Transcriber`]
//! splits long recordings into segments, recognizes them with bounded concurrency
//! and folds the per-segment results into a single [`TranscriptionOutcome`].

mod whisper;

pub use whisper::WhisperRecognizer;

use crate::config::TranscriptionSettings;
use crate::media::NormalizedAudio;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Why a single recognition request produced no text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionError {
    /// The service answered but found no intelligible speech.
    #[error("no intelligible speech")]
    Unintelligible,
    /// The request failed (network, quota, malformed response).
    #[error("recognition service error: {0}")]
    Service(String),
}

/// Speech recognition capability.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Recognize speech in a mono 16 kHz PCM16 WAV file.
    async fn recognize(&self, wav: &[u8]) -> std::result::Result<String, RecognitionError>;
}

/// Result of transcribing one recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    Text(String),
    Unintelligible,
    ServiceFailure(String),
}

/// Segmenting front end for a [`SpeechRecognizer`].
#[derive(Clone)]
pub struct Transcriber {
    recognizer: Arc<dyn SpeechRecognizer>,
    segment_seconds: u32,
    max_concurrent_segments: usize,
    timeout: Duration,
}

impl Transcriber {
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        settings: &TranscriptionSettings,
        timeout: Duration,
    ) -> Self {
        Self {
            recognizer,
            segment_seconds: settings.segment_seconds,
            max_concurrent_segments: settings.max_concurrent_segments.max(1),
            timeout,
        }
    }

    /// Transcribe the whole recording.
    ///
    /// Segment texts are joined in order. Any service error (including a timed out
    /// request) fails the recording; it is unintelligible only when no segment
    /// yielded text.
    #[instrument(skip_all, fields(duration = audio.duration_seconds()))]
    pub async fn transcribe(&self, audio: &NormalizedAudio) -> TranscriptionOutcome {
        let segments = audio.segments(self.segment_seconds);
        let count = segments.len();
        if count > 1 {
            info!("Transcribing {} segments", count);
        }

        let mut results: Vec<(usize, std::result::Result<String, RecognitionError>)> =
            stream::iter(segments.into_iter().enumerate())
                .map(|(idx, wav)| async move {
                    let result =
                        match tokio::time::timeout(self.timeout, self.recognizer.recognize(&wav))
                            .await
                        {
                            Ok(result) => result,
                            Err(_) => Err(RecognitionError::Service(format!(
                                "recognition timed out after {}s",
                                self.timeout.as_secs()
                            ))),
                        };
                    (idx, result)
                })
                .buffer_unordered(self.max_concurrent_segments)
                .collect()
                .await;

        results.sort_by_key(|(idx, _)| *idx);

        let mut texts = Vec::with_capacity(count);
        let mut errors = Vec::new();
        for (idx, result) in results {
            match result {
                Ok(text) => texts.push(text),
                Err(RecognitionError::Unintelligible) => {
                    debug!(segment = idx, "Segment unintelligible");
                }
                Err(RecognitionError::Service(msg)) => {
                    warn!(segment = idx, "Segment recognition failed: {}", msg);
                    errors.push(format!("segment {}: {}", idx, msg));
                }
            }
        }

        if !errors.is_empty() {
            return TranscriptionOutcome::ServiceFailure(errors.join("; "));
        }
        if texts.is_empty() {
            return TranscriptionOutcome::Unintelligible;
        }

        TranscriptionOutcome::Text(texts.join(" "))
    }
}
