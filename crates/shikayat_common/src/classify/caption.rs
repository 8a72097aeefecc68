//! Image captioning seam.
//!
//! The hosted vision model turns a photo into a short caption; the caption
//! then flows through the text classification path. Unreadable images are
//! rejected here so the adapter can degrade instead of erroring out.

use crate::config::CaptionSettings;
use std::time::Duration;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CaptionError {
    #[error("unsupported or corrupted image payload")]
    BadImage,

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("model returned no caption")]
    EmptyCaption,
}

pub trait ImageCaptioner: Send + Sync {
    fn caption(&self, image: &[u8]) -> Result<String, CaptionError>;
}

/// Sniff the payload before shipping it anywhere. PNG and JPEG cover what
/// the citizen form accepts.
pub fn image_content_type(image: &[u8]) -> Option<&'static str> {
    if image.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        Some("image/png")
    } else if image.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else {
        None
    }
}

/// Captioner backed by a hosted inference endpoint (BLIP-style: POST raw
/// image bytes, receive `[{"generated_text": ...}]`).
pub struct HttpCaptioner {
    settings: CaptionSettings,
    client: reqwest::blocking::Client,
}

impl HttpCaptioner {
    pub fn new(settings: CaptionSettings) -> Result<Self, CaptionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| CaptionError::HttpError(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { settings, client })
    }
}

impl ImageCaptioner for HttpCaptioner {
    fn caption(&self, image: &[u8]) -> Result<String, CaptionError> {
        let content_type = image_content_type(image).ok_or(CaptionError::BadImage)?;

        let mut request = self
            .client
            .post(&self.settings.endpoint)
            .header("Content-Type", content_type)
            .body(image.to_vec());

        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| CaptionError::HttpError(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(CaptionError::HttpError(format!(
                "HTTP {} from captioning endpoint",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .map_err(|e| CaptionError::HttpError(format!("bad response body: {}", e)))?;

        let caption = body[0]["generated_text"]
            .as_str()
            .or_else(|| body["generated_text"].as_str())
            .unwrap_or("")
            .trim()
            .to_string();

        if caption.is_empty() {
            return Err(CaptionError::EmptyCaption);
        }
        Ok(caption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_sniffing() {
        assert_eq!(
            image_content_type(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
            Some("image/png")
        );
        assert_eq!(
            image_content_type(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some("image/jpeg")
        );
        assert_eq!(image_content_type(b"not an image"), None);
        assert_eq!(image_content_type(&[]), None);
    }
}
