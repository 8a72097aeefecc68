//! LLM client abstraction.
//!
//! Generic interface for calling a hosted LLM with strict JSON expectations.
//! Real implementation speaks the OpenAI-compatible chat-completions API
//! (Groq); fake clients back the tests.

use crate::config::LlmSettings;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

/// LLM errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("LLM is disabled in configuration")]
    Disabled,

    #[error("no API key configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("invalid JSON response: {0}")]
    InvalidJson(String),

    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    #[error("LLM returned empty response")]
    EmptyResponse,
}

/// Generic LLM client trait
pub trait LlmClient: Send + Sync {
    /// Call the LLM with a prompt and expect a JSON object back.
    fn call_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<serde_json::Value, LlmError>;

    /// Call the LLM and return plain text.
    fn call_text(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

/// Real LLM client over HTTP.
pub struct HttpLlmClient {
    settings: LlmSettings,
    client: reqwest::blocking::Client,
}

impl HttpLlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| LlmError::HttpError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { settings, client })
    }

    fn chat(&self, system_prompt: &str, user_prompt: &str, temperature: f64) -> Result<String, LlmError> {
        if !self.settings.enabled {
            return Err(LlmError::Disabled);
        }
        let api_key = self.settings.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let url = format!("{}/chat/completions", self.settings.endpoint.trim_end_matches('/'));
        let request_body = serde_json::json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "temperature": temperature,
            "max_tokens": 1000,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.settings.timeout_secs)
                } else {
                    LlmError::HttpError(format!("request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(LlmError::HttpError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let body: serde_json::Value = response
            .json()
            .map_err(|e| LlmError::InvalidJson(e.to_string()))?;

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content)
    }
}

impl LlmClient for HttpLlmClient {
    fn call_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<serde_json::Value, LlmError> {
        let raw = self.chat(system_prompt, user_prompt, 0.1)?;
        extract_json(&raw).ok_or_else(|| LlmError::InvalidJson(truncate(&raw, 200)))
    }

    fn call_text(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        self.chat(system_prompt, user_prompt, 0.3)
    }
}

static JSON_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// Extract the first JSON object from a response, tolerating surrounding
/// prose or markdown fences.
pub fn extract_json(raw: &str) -> Option<serde_json::Value> {
    let candidate = JSON_OBJECT_RE.find(raw)?.as_str();
    serde_json::from_str(candidate).ok()
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    // Walk back to a char boundary; slicing mid-character panics.
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
