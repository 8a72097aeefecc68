//! Classifier adapter.
//!
//! Wraps three independent classifiers (image captioning, speech-to-text,
//! LLM text classification) behind one interface producing a normalized
//! `(issue_type, confidence)` pair plus an optional transcript.
//!
//! Classification failure must never block complaint creation: every error
//! path degrades to `IssueType::Other` with confidence 0.

pub mod caption;
pub mod keywords;
pub mod llm;
pub mod transcribe;

use crate::config::ShikayatConfig;
use crate::types::IssueType;
use caption::{HttpCaptioner, ImageCaptioner};
use keywords::{classify_keywords, KEYWORD_CONFIDENCE};
use llm::{HttpLlmClient, LlmClient};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use transcribe::{HttpTranscriber, SpeechToText};

/// Normalized classifier output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub issue_type: IssueType,
    /// In [0, 1]. Zero means the classifiers had nothing to say.
    pub confidence: f64,
    /// Present for the voice path (Whisper transcript) and the image path
    /// (generated caption).
    pub transcript: Option<String>,
}

impl Classification {
    fn other() -> Self {
        Self {
            issue_type: IssueType::Other,
            confidence: 0.0,
            transcript: None,
        }
    }
}

const CLASSIFY_SYSTEM_PROMPT: &str =
    "You are a civic issue classifier for Pakistani cities. Respond with JSON only.";

/// Unified classifier over injected model handles.
pub struct ComplaintClassifier {
    llm: Option<Arc<dyn LlmClient>>,
    captioner: Option<Arc<dyn ImageCaptioner>>,
    transcriber: Option<Arc<dyn SpeechToText>>,
}

impl ComplaintClassifier {
    pub fn new(
        llm: Option<Arc<dyn LlmClient>>,
        captioner: Option<Arc<dyn ImageCaptioner>>,
        transcriber: Option<Arc<dyn SpeechToText>>,
    ) -> Self {
        Self {
            llm,
            captioner,
            transcriber,
        }
    }

    /// Build HTTP-backed classifiers from config. A backend that cannot be
    /// constructed is left out; the adapter falls back at call time.
    pub fn from_config(config: &ShikayatConfig) -> Self {
        let llm: Option<Arc<dyn LlmClient>> = match HttpLlmClient::new(config.llm.clone()) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("LLM classifier unavailable: {}", e);
                None
            }
        };
        let captioner: Option<Arc<dyn ImageCaptioner>> =
            match HttpCaptioner::new(config.caption.clone()) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("Image captioner unavailable: {}", e);
                    None
                }
            };
        let transcriber: Option<Arc<dyn SpeechToText>> =
            match HttpTranscriber::new(config.transcribe.clone()) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("Transcriber unavailable: {}", e);
                    None
                }
            };
        Self::new(llm, captioner, transcriber)
    }

    /// Classify free text.
    pub fn classify_text(&self, text: &str) -> Classification {
        let text = text.trim();
        if text.is_empty() {
            return Classification::other();
        }

        if let Some(llm) = &self.llm {
            match self.classify_with_llm(llm.as_ref(), text) {
                Ok(classification) => return classification,
                Err(e) => {
                    warn!("LLM classification failed, using keyword fallback: {}", e);
                }
            }
        }

        match classify_keywords(text) {
            Some(issue_type) => Classification {
                issue_type,
                confidence: KEYWORD_CONFIDENCE,
                transcript: None,
            },
            None => Classification::other(),
        }
    }

    /// Classify an image: caption first, then run the caption through the
    /// text path. Unreadable payloads degrade to Other.
    pub fn classify_image(&self, image: &[u8]) -> Classification {
        let captioner = match &self.captioner {
            Some(c) => c,
            None => {
                warn!("No image captioner configured, degrading to Other");
                return Classification::other();
            }
        };
        match captioner.caption(image) {
            Ok(caption) => {
                let mut classification = self.classify_text(&caption);
                classification.transcript = Some(caption);
                classification
            }
            Err(e) => {
                warn!("Image captioning failed, degrading to Other: {}", e);
                Classification::other()
            }
        }
    }

    /// Classify a voice recording: transcribe first, then run the
    /// transcript through the text path.
    pub fn classify_audio(&self, audio: &[u8], language: Option<&str>) -> Classification {
        let transcriber = match &self.transcriber {
            Some(t) => t,
            None => {
                warn!("No transcriber configured, degrading to Other");
                return Classification::other();
            }
        };
        let transcript = match transcriber.transcribe(audio, language) {
            Ok(text) => text,
            Err(e) => {
                warn!("Transcription failed, degrading to Other: {}", e);
                return Classification::other();
            }
        };
        if transcript.is_empty() {
            return Classification {
                issue_type: IssueType::Other,
                confidence: 0.0,
                transcript: Some(String::new()),
            };
        }
        let mut classification = self.classify_text(&transcript);
        classification.transcript = Some(transcript);
        classification
    }

    fn classify_with_llm(
        &self,
        llm: &dyn LlmClient,
        text: &str,
    ) -> Result<Classification, llm::LlmError> {
        let issue_list = IssueType::ALL
            .iter()
            .map(|t| format!("\"{}\"", t.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let user_prompt = format!(
            "Classify this civic issue description into exactly one issue type.\n\
             Allowed issue types: [{}]\n\n\
             Description: \"{}\"\n\n\
             Return ONLY a JSON object: {{\"issue_type\": <one of the allowed types>, \
             \"confidence\": <number between 0 and 1>}}",
            issue_list, text
        );
        let value = llm.call_json(CLASSIFY_SYSTEM_PROMPT, &user_prompt)?;

        let issue_type = value["issue_type"]
            .as_str()
            .and_then(IssueType::parse)
            .unwrap_or(IssueType::Other);
        let confidence = value["confidence"].as_f64().unwrap_or(0.0).clamp(0.0, 1.0);

        Ok(Classification {
            issue_type,
            confidence,
            transcript: None,
        })
    }
}

/// Process-wide classifier cache.
///
/// Lazy, idempotent initialization: the first caller builds the instance,
/// later callers share it. Tests inject fakes through `set`.
pub struct ClassifierCache {
    slot: OnceCell<Arc<ComplaintClassifier>>,
}

impl ClassifierCache {
    pub const fn new() -> Self {
        Self {
            slot: OnceCell::new(),
        }
    }

    pub fn get_or_init<F>(&self, build: F) -> Arc<ComplaintClassifier>
    where
        F: FnOnce() -> ComplaintClassifier,
    {
        self.slot.get_or_init(|| Arc::new(build())).clone()
    }

    /// Inject an instance. Fails if the cache is already populated.
    pub fn set(&self, classifier: Arc<ComplaintClassifier>) -> Result<(), Arc<ComplaintClassifier>> {
        self.slot.set(classifier)
    }

    pub fn get(&self) -> Option<Arc<ComplaintClassifier>> {
        self.slot.get().cloned()
    }
}

impl Default for ClassifierCache {
    fn default() -> Self {
        Self::new()
    }
}

static PROCESS_CLASSIFIER: ClassifierCache = ClassifierCache::new();

/// Shared classifier for the process lifetime; models behind it are loaded
/// once and reused.
pub fn process_classifier(config: &ShikayatConfig) -> Arc<ComplaintClassifier> {
    PROCESS_CLASSIFIER.get_or_init(|| ComplaintClassifier::from_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::caption::CaptionError;
    use crate::classify::llm::LlmError;

    pub struct FakeLlm {
        pub response: serde_json::Value,
    }

    impl LlmClient for FakeLlm {
        fn call_json(&self, _: &str, _: &str) -> Result<serde_json::Value, LlmError> {
            Ok(self.response.clone())
        }
        fn call_text(&self, _: &str, _: &str) -> Result<String, LlmError> {
            Ok(self.response.to_string())
        }
    }

    struct FailingLlm;

    impl LlmClient for FailingLlm {
        fn call_json(&self, _: &str, _: &str) -> Result<serde_json::Value, LlmError> {
            Err(LlmError::HttpError("connection refused".to_string()))
        }
        fn call_text(&self, _: &str, _: &str) -> Result<String, LlmError> {
            Err(LlmError::HttpError("connection refused".to_string()))
        }
    }

    struct EchoCaptioner(String);

    impl ImageCaptioner for EchoCaptioner {
        fn caption(&self, image: &[u8]) -> Result<String, CaptionError> {
            if caption::image_content_type(image).is_none() {
                return Err(CaptionError::BadImage);
            }
            Ok(self.0.clone())
        }
    }

    fn text_only(llm: Arc<dyn LlmClient>) -> ComplaintClassifier {
        ComplaintClassifier::new(Some(llm), None, None)
    }

    #[test]
    fn test_llm_classification() {
        let classifier = text_only(Arc::new(FakeLlm {
            response: serde_json::json!({"issue_type": "Water Leak", "confidence": 0.92}),
        }));
        let result = classifier.classify_text("burst pipe flooding the street");
        assert_eq!(result.issue_type, IssueType::WaterLeak);
        assert!((result.confidence - 0.92).abs() < 1e-9);
    }

    #[test]
    fn test_llm_unknown_label_degrades_to_other() {
        let classifier = text_only(Arc::new(FakeLlm {
            response: serde_json::json!({"issue_type": "Meteor Strike", "confidence": 0.99}),
        }));
        let result = classifier.classify_text("a meteor hit the bazaar");
        assert_eq!(result.issue_type, IssueType::Other);
    }

    #[test]
    fn test_llm_confidence_clamped() {
        let classifier = text_only(Arc::new(FakeLlm {
            response: serde_json::json!({"issue_type": "Pothole", "confidence": 7.5}),
        }));
        let result = classifier.classify_text("pothole");
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_llm_failure_falls_back_to_keywords() {
        let classifier = text_only(Arc::new(FailingLlm));
        let result = classifier.classify_text("huge pothole near the school");
        assert_eq!(result.issue_type, IssueType::Pothole);
        assert_eq!(result.confidence, KEYWORD_CONFIDENCE);
    }

    #[test]
    fn test_empty_text_is_other() {
        let classifier = ComplaintClassifier::new(None, None, None);
        let result = classifier.classify_text("   ");
        assert_eq!(result.issue_type, IssueType::Other);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_corrupted_image_degrades_without_error() {
        let classifier = ComplaintClassifier::new(
            None,
            Some(Arc::new(EchoCaptioner("a pothole".to_string()))),
            None,
        );
        let result = classifier.classify_image(b"definitely not an image");
        assert_eq!(result.issue_type, IssueType::Other);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_image_caption_flows_through_text_path() {
        let classifier = ComplaintClassifier::new(
            None,
            Some(Arc::new(EchoCaptioner(
                "a large pothole in an asphalt road".to_string(),
            ))),
            None,
        );
        let png_header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let result = classifier.classify_image(&png_header);
        assert_eq!(result.issue_type, IssueType::Pothole);
        assert_eq!(result.transcript.as_deref(), Some("a large pothole in an asphalt road"));
    }

    #[test]
    fn test_cache_is_idempotent() {
        let cache = ClassifierCache::new();
        let first = cache.get_or_init(|| ComplaintClassifier::new(None, None, None));
        let second = cache.get_or_init(|| panic!("must not rebuild"));
        assert!(Arc::ptr_eq(&first, &second));
    }
}
