//! Integration tests for the submission pipeline and status lifecycle.
//!
//! Scenarios:
//! 1. Text submission flows through classification, enrichment, and
//!    storage with a tracked Pending complaint
//! 2. Corrupted media degrades to Other without blocking creation
//! 3. Admin transitions append history and survive concurrency races
//! 4. Terminal complaints reject every further transition

use crate::classify::llm::{LlmClient, LlmError};
use crate::classify::ComplaintClassifier;
use crate::config::ShikayatConfig;
use crate::error::{SubmitError, TransitionError};
use crate::formal::Language;
use crate::geocode::Geocoder;
use crate::lifecycle::LifecycleManager;
use crate::notify::NullNotifier;
use crate::pipeline::{ReportInput, Submission, SubmissionPipeline};
use crate::store::ComplaintStore;
use crate::types::{IssueType, Severity, Status};
use std::sync::Arc;

/// LLM stub returning a fixed classification.
struct CannedLlm(serde_json::Value);

impl LlmClient for CannedLlm {
    fn call_json(&self, _: &str, _: &str) -> Result<serde_json::Value, LlmError> {
        Ok(self.0.clone())
    }
    fn call_text(&self, _: &str, _: &str) -> Result<String, LlmError> {
        Err(LlmError::Disabled)
    }
}

struct FixedGeocoder(f64, f64);

impl Geocoder for FixedGeocoder {
    fn geocode(&self, _: &str) -> Option<(f64, f64)> {
        Some((self.0, self.1))
    }
}

fn pipeline_with(
    store: Arc<ComplaintStore>,
    llm: Option<Arc<dyn LlmClient>>,
) -> SubmissionPipeline {
    let config = ShikayatConfig::seeded_default();
    let classifier = Arc::new(ComplaintClassifier::new(llm, None, None));
    SubmissionPipeline::new(
        &config,
        classifier,
        Some(Arc::new(FixedGeocoder(31.5497, 74.3436))),
        store,
        Arc::new(NullNotifier),
        None,
    )
}

fn text_submission(text: &str, district: &str) -> Submission {
    Submission {
        input: ReportInput::Text(text.to_string()),
        district: district.to_string(),
        location: "Mall Road".to_string(),
        email: Some("citizen@example.pk".to_string()),
        phone: None,
        language: Language::English,
        attach_image: false,
    }
}

// ============================================================================
// Scenario 1: text submission end to end
// ============================================================================

#[test]
fn test_pothole_report_end_to_end() {
    let store = Arc::new(ComplaintStore::open_in_memory().unwrap());
    // Keyword fallback path: no LLM configured.
    let pipeline = pipeline_with(Arc::clone(&store), None);

    let receipt = pipeline
        .submit(text_submission(
            "Large pothole on Mall Road causing accidents",
            "Lahore",
        ))
        .unwrap();

    assert_eq!(receipt.issue_type, IssueType::Pothole);
    assert_eq!(receipt.severity, Severity::High);
    assert!(receipt.department.contains("Roads"));
    assert_eq!(receipt.status, Status::Pending);
    assert!(receipt.tracking_id.starts_with("CIV-"));

    let stored = store.get(&receipt.tracking_id).unwrap().unwrap();
    assert_eq!(stored.status, Status::Pending);
    assert_eq!(stored.district, "Lahore");
    assert_eq!(stored.latitude, Some(31.5497));
    assert!(stored.description.contains("pothole") || stored.description.contains("Pothole"));
}

#[test]
fn test_llm_classification_drives_enrichment() {
    let store = Arc::new(ComplaintStore::open_in_memory().unwrap());
    let llm: Arc<dyn LlmClient> = Arc::new(CannedLlm(serde_json::json!({
        "issue_type": "Sewage Overflow",
        "confidence": 0.88,
    })));
    let pipeline = pipeline_with(Arc::clone(&store), Some(llm));

    let receipt = pipeline
        .submit(text_submission("dirty water everywhere near the bazaar", "Multan"))
        .unwrap();

    assert_eq!(receipt.issue_type, IssueType::SewageOverflow);
    assert_eq!(receipt.severity, Severity::High);
    assert_eq!(receipt.department, "Water & Sewerage Authority");
    assert!((receipt.confidence - 0.88).abs() < 1e-9);
}

#[test]
fn test_unknown_district_rejected_with_field_error() {
    let store = Arc::new(ComplaintStore::open_in_memory().unwrap());
    let pipeline = pipeline_with(store, None);

    let err = pipeline
        .submit(text_submission("pothole", "Atlantis"))
        .unwrap_err();
    assert!(matches!(err, SubmitError::Validation { ref field, .. } if field == "district"));
}

// ============================================================================
// Scenario 2: degraded classification never blocks creation
// ============================================================================

#[test]
fn test_corrupted_image_still_creates_complaint() {
    let store = Arc::new(ComplaintStore::open_in_memory().unwrap());
    let pipeline = pipeline_with(Arc::clone(&store), None);

    let receipt = pipeline
        .submit(Submission {
            input: ReportInput::Image(b"garbage bytes, not an image".to_vec()),
            attach_image: true,
            ..text_submission("", "Lahore")
        })
        .unwrap();

    // Classification degraded, submission still landed.
    assert_eq!(receipt.issue_type, IssueType::Other);
    assert_eq!(receipt.confidence, 0.0);
    let stored = store.get(&receipt.tracking_id).unwrap().unwrap();
    assert_eq!(stored.severity, Severity::Medium);
    assert_eq!(stored.department, "General Administration");
    // Unreadable payloads are not stored as media either.
    assert!(stored.image_ref.is_none());
}

#[test]
fn test_silent_audio_yields_validation_error() {
    let store = Arc::new(ComplaintStore::open_in_memory().unwrap());
    let pipeline = pipeline_with(store, None);

    // No transcriber configured: the voice path degrades to no transcript,
    // leaving nothing to describe the complaint with.
    let err = pipeline
        .submit(Submission {
            input: ReportInput::Audio {
                bytes: vec![0u8; 64],
                language: None,
            },
            ..text_submission("", "Lahore")
        })
        .unwrap_err();
    assert!(matches!(err, SubmitError::Validation { ref field, .. } if field == "description"));
}

// ============================================================================
// Scenario 3: admin lifecycle
// ============================================================================

#[test]
fn test_admin_transition_appends_history() {
    let store = Arc::new(ComplaintStore::open_in_memory().unwrap());
    let pipeline = pipeline_with(Arc::clone(&store), None);
    let receipt = pipeline
        .submit(text_submission("pothole near school", "Lahore"))
        .unwrap();

    let manager = LifecycleManager::new(Arc::clone(&store), Arc::new(NullNotifier));
    let update = manager
        .transition(&receipt.tracking_id, Status::InProgress, "crew assigned", "admin")
        .unwrap();

    assert_eq!(update.old_status, Status::Pending);
    assert_eq!(update.new_status, Status::InProgress);

    let stored = store.get(&receipt.tracking_id).unwrap().unwrap();
    assert_eq!(stored.status, Status::InProgress);

    let history = store.history(&receipt.tracking_id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].note, "crew assigned");
}

#[test]
fn test_resolved_complaint_rejects_reopening() {
    let store = Arc::new(ComplaintStore::open_in_memory().unwrap());
    let pipeline = pipeline_with(Arc::clone(&store), None);
    let receipt = pipeline
        .submit(text_submission("streetlight out on canal road", "Lahore"))
        .unwrap();

    let manager = LifecycleManager::new(Arc::clone(&store), Arc::new(NullNotifier));
    manager
        .transition(&receipt.tracking_id, Status::Assigned, "", "admin")
        .unwrap();
    manager
        .transition(&receipt.tracking_id, Status::Resolved, "fixed", "admin")
        .unwrap();

    let err = manager
        .transition(&receipt.tracking_id, Status::Pending, "reopen", "admin")
        .unwrap_err();
    assert!(matches!(err, TransitionError::InvalidTransition { .. }));

    let stored = store.get(&receipt.tracking_id).unwrap().unwrap();
    assert_eq!(stored.status, Status::Resolved);
    // No audit row for the rejected attempt.
    assert_eq!(store.history(&receipt.tracking_id).unwrap().len(), 2);
}

// ============================================================================
// Scenario 4: unique tracking ids under load
// ============================================================================

#[test]
fn test_bulk_submissions_get_unique_tracking_ids() {
    let store = Arc::new(ComplaintStore::open_in_memory().unwrap());
    let pipeline = pipeline_with(Arc::clone(&store), None);

    let mut ids = std::collections::HashSet::new();
    for i in 0..200 {
        let receipt = pipeline
            .submit(text_submission(&format!("pothole number {}", i), "Lahore"))
            .unwrap();
        assert!(ids.insert(receipt.tracking_id), "duplicate tracking id");
    }
    assert_eq!(store.list(&Default::default()).unwrap().len(), 200);
}
