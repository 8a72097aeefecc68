//! Speech-to-text seam.
//!
//! Sends recorded WAV bytes to a hosted Whisper endpoint. An unsupported
//! language or codec yields an empty transcript, which the adapter treats
//! as "nothing heard" rather than a failure.

use crate::config::TranscribeSettings;
use std::time::Duration;

/// Recordings below this size carry no usable speech.
pub const MIN_AUDIO_BYTES: usize = 200;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TranscribeError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    HttpError(String),
}

pub trait SpeechToText: Send + Sync {
    /// Transcribe audio bytes. `language` is an ISO code ("en", "ur") or
    /// None for auto-detection. An empty string means no speech detected.
    fn transcribe(&self, audio: &[u8], language: Option<&str>) -> Result<String, TranscribeError>;
}

/// Whisper transcription over the Groq audio API (multipart upload).
pub struct HttpTranscriber {
    settings: TranscribeSettings,
    client: reqwest::blocking::Client,
}

impl HttpTranscriber {
    pub fn new(settings: TranscribeSettings) -> Result<Self, TranscribeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| TranscribeError::HttpError(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { settings, client })
    }
}

impl SpeechToText for HttpTranscriber {
    fn transcribe(&self, audio: &[u8], language: Option<&str>) -> Result<String, TranscribeError> {
        if audio.len() < MIN_AUDIO_BYTES {
            return Ok(String::new());
        }
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(TranscribeError::MissingApiKey)?;

        let part = reqwest::blocking::multipart::Part::bytes(audio.to_vec())
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscribeError::HttpError(e.to_string()))?;

        let mut form = reqwest::blocking::multipart::Form::new()
            .text("model", self.settings.model.clone())
            .text("response_format", "text")
            .part("file", part);

        // The endpoint rejects "auto"; omit the field for auto-detection.
        if let Some(lang) = language {
            if lang != "auto" {
                form = form.text("language", lang.to_string());
            }
        }

        let response = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .map_err(|e| TranscribeError::HttpError(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(TranscribeError::HttpError(format!(
                "HTTP {} from transcription endpoint",
                response.status()
            )));
        }

        let text = response
            .text()
            .map_err(|e| TranscribeError::HttpError(format!("bad response body: {}", e)))?;

        Ok(text.trim().to_string())
    }
}
