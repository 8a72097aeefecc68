//! Citizen submission pipeline.
//!
//! Raw multi-modal input goes in; a persisted, trackable complaint comes
//! out. Classification, geocoding, letter drafting, and the confirmation
//! notification are all best-effort; validation and storage failures are
//! the only hard stops.

use crate::builder::{ComplaintDraft, RecordBuilder};
use crate::classify::caption::image_content_type;
use crate::classify::llm::LlmClient;
use crate::classify::{Classification, ComplaintClassifier};
use crate::config::ShikayatConfig;
use crate::enrich::EnrichmentTable;
use crate::error::SubmitError;
use crate::formal::{self, Language, LetterInput};
use crate::geocode::Geocoder;
use crate::notify::{dispatch, NotificationEvent, Notifier, Recipient};
use crate::store::ComplaintStore;
use crate::types::{Complaint, IssueType, Severity};
use std::sync::Arc;
use tracing::{info, warn};

/// Tracking-id collision retries before giving up. With the id space in
/// use, more than one retry is already extraordinary.
const MAX_CREATE_ATTEMPTS: usize = 5;

/// Exactly one of text, image, or audio carries the citizen's report.
#[derive(Debug, Clone)]
pub enum ReportInput {
    Text(String),
    Image(Vec<u8>),
    Audio { bytes: Vec<u8>, language: Option<String> },
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub input: ReportInput,
    pub district: String,
    pub location: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub language: Language,
    /// Attached photo for image submissions; stored in the blob store.
    pub attach_image: bool,
}

/// What the citizen gets back.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubmissionReceipt {
    pub tracking_id: String,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub department: String,
    pub status: crate::types::Status,
    pub confidence: f64,
}

pub struct SubmissionPipeline {
    classifier: Arc<ComplaintClassifier>,
    enrichment: EnrichmentTable,
    geocoder: Option<Arc<dyn Geocoder>>,
    store: Arc<ComplaintStore>,
    notifier: Arc<dyn Notifier>,
    builder: RecordBuilder,
    /// LLM handle for drafting formal letters; None keeps the citizen's
    /// own words as the description.
    letter_llm: Option<Arc<dyn LlmClient>>,
}

impl SubmissionPipeline {
    pub fn new(
        config: &ShikayatConfig,
        classifier: Arc<ComplaintClassifier>,
        geocoder: Option<Arc<dyn Geocoder>>,
        store: Arc<ComplaintStore>,
        notifier: Arc<dyn Notifier>,
        letter_llm: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        Self {
            classifier,
            enrichment: EnrichmentTable::from_config(config),
            geocoder,
            store,
            notifier,
            builder: RecordBuilder::new(config.districts.clone(), config.tracking_prefix.clone()),
            letter_llm,
        }
    }

    /// Process one citizen submission end to end.
    pub fn submit(&self, submission: Submission) -> Result<SubmissionReceipt, SubmitError> {
        let (classification, user_text, image_bytes) = self.classify(&submission);

        let issue_type = classification.issue_type;
        let (severity, department) = self.enrichment.enrich(issue_type);

        // The description the record carries: the citizen's words (or the
        // transcript/caption), wrapped into a formal letter when drafting
        // succeeds.
        let raw_description = user_text.trim().to_string();
        if raw_description.is_empty() {
            return Err(SubmitError::validation(
                "description",
                "no usable text, transcript, or caption in the submission",
            ));
        }
        let description = if let Some(llm) = &self.letter_llm {
            formal::compose(
                Some(llm.as_ref()),
                &LetterInput {
                    issue_type,
                    severity,
                    department: &department,
                    location: &submission.location,
                    district: &submission.district,
                    description: &raw_description,
                },
                submission.language,
            )
        } else {
            raw_description.clone()
        };

        let coords = self.geocode(&submission);

        let image_ref = match image_bytes {
            Some(bytes) if submission.attach_image => self.store_image(&bytes),
            _ => None,
        };

        let draft = ComplaintDraft {
            issue_type,
            severity,
            department,
            description,
            district: submission.district.clone(),
            location: submission.location.clone(),
            latitude: coords.map(|(lat, _)| lat),
            longitude: coords.map(|(_, lon)| lon),
            email: submission.email.clone(),
            phone: submission.phone.clone(),
            image_ref,
        };
        let complaint = self.create_with_retry(draft)?;

        info!(
            "Complaint {} created: {} / {} / {}",
            complaint.tracking_id, complaint.issue_type, complaint.severity, complaint.district
        );

        let event = NotificationEvent::confirmation(&complaint);
        dispatch(
            self.notifier.as_ref(),
            &self.store,
            &Recipient::of(&complaint),
            &event,
        );

        Ok(SubmissionReceipt {
            tracking_id: complaint.tracking_id,
            issue_type: complaint.issue_type,
            severity: complaint.severity,
            department: complaint.department,
            status: complaint.status,
            confidence: classification.confidence,
        })
    }

    fn classify(&self, submission: &Submission) -> (Classification, String, Option<Vec<u8>>) {
        match &submission.input {
            ReportInput::Text(text) => {
                let classification = self.classifier.classify_text(text);
                (classification, text.clone(), None)
            }
            ReportInput::Image(bytes) => {
                let classification = self.classifier.classify_image(bytes);
                let text = classification
                    .transcript
                    .clone()
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "See attached image".to_string());
                (classification, text, Some(bytes.clone()))
            }
            ReportInput::Audio { bytes, language } => {
                let classification = self.classifier.classify_audio(bytes, language.as_deref());
                let text = classification.transcript.clone().unwrap_or_default();
                (classification, text, None)
            }
        }
    }

    fn geocode(&self, submission: &Submission) -> Option<(f64, f64)> {
        let geocoder = self.geocoder.as_ref()?;
        let query = format!("{}, {}", submission.location, submission.district);
        geocoder.geocode(&query)
    }

    fn store_image(&self, bytes: &[u8]) -> Option<String> {
        let content_type = image_content_type(bytes)?;
        match self.store.store_media(bytes, content_type) {
            Ok(media_ref) => Some(media_ref),
            Err(e) => {
                warn!("Could not store complaint image, continuing without it: {}", e);
                None
            }
        }
    }

    fn create_with_retry(&self, draft: ComplaintDraft) -> Result<Complaint, SubmitError> {
        let mut complaint = self.builder.build(draft)?;
        for attempt in 0..MAX_CREATE_ATTEMPTS {
            if self.store.create_complaint(&complaint)? {
                return Ok(complaint);
            }
            warn!(
                "Tracking id {} collided (attempt {}), regenerating",
                complaint.tracking_id,
                attempt + 1
            );
            complaint.tracking_id = self.builder.regenerate_tracking_id();
        }
        Err(SubmitError::Store(anyhow::anyhow!(
            "could not allocate a unique tracking id after {} attempts",
            MAX_CREATE_ATTEMPTS
        )))
    }
}
