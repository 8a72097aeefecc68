//! Complaint record builder.
//!
//! Assembles a fully-populated Complaint from user-supplied fields plus
//! classifier and enrichment output. Validation errors carry field-level
//! detail for display; invalid contact info is rejected, never silently
//! dropped.

use crate::error::SubmitError;
use crate::tracking::generate_tracking_id;
use crate::types::{Complaint, IssueType, Severity, Status};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{5,17}$").expect("valid regex"));

/// Everything the builder needs that is not configuration.
#[derive(Debug, Clone)]
pub struct ComplaintDraft {
    pub issue_type: IssueType,
    pub severity: Severity,
    pub department: String,
    pub description: String,
    pub district: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub image_ref: Option<String>,
}

pub struct RecordBuilder {
    districts: Vec<String>,
    tracking_prefix: String,
}

impl RecordBuilder {
    pub fn new(districts: Vec<String>, tracking_prefix: String) -> Self {
        Self {
            districts,
            tracking_prefix,
        }
    }

    /// Validate the draft and mint a Complaint with a fresh tracking id and
    /// status Pending.
    pub fn build(&self, draft: ComplaintDraft) -> Result<Complaint, SubmitError> {
        if draft.description.trim().is_empty() {
            return Err(SubmitError::validation(
                "description",
                "description must not be empty",
            ));
        }
        if draft.location.trim().is_empty() {
            return Err(SubmitError::validation(
                "location",
                "location must not be empty",
            ));
        }
        self.validate_district(&draft.district)?;

        let email = match draft.email {
            Some(email) => Some(validate_email(&email)?),
            None => None,
        };
        let phone = match draft.phone {
            Some(phone) => Some(validate_phone(&phone)?),
            None => None,
        };

        Ok(Complaint {
            tracking_id: generate_tracking_id(&self.tracking_prefix),
            issue_type: draft.issue_type,
            severity: draft.severity,
            department: draft.department,
            description: draft.description,
            district: draft.district,
            location: draft.location,
            latitude: draft.latitude,
            longitude: draft.longitude,
            status: Status::Pending,
            email,
            phone,
            image_ref: draft.image_ref,
            created_at: Utc::now(),
        })
    }

    /// A fresh id for the same draft, used when the store reports a
    /// tracking-id collision.
    pub fn regenerate_tracking_id(&self) -> String {
        generate_tracking_id(&self.tracking_prefix)
    }

    fn validate_district(&self, district: &str) -> Result<(), SubmitError> {
        let known = self
            .districts
            .iter()
            .any(|d| d.eq_ignore_ascii_case(district.trim()));
        if !known {
            return Err(SubmitError::validation(
                "district",
                format!("'{}' is not a configured district", district),
            ));
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<String, SubmitError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(SubmitError::validation(
            "email",
            format!("'{}' is not a valid email address", email),
        ));
    }
    Ok(email.to_lowercase())
}

fn validate_phone(phone: &str) -> Result<String, SubmitError> {
    let phone = phone.trim();
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !PHONE_RE.is_match(phone) || !(7..=15).contains(&digits) {
        return Err(SubmitError::validation(
            "phone",
            format!("'{}' is not a valid phone number", phone),
        ));
    }
    Ok(phone.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> RecordBuilder {
        RecordBuilder::new(
            vec!["Lahore".to_string(), "Multan".to_string()],
            "CIV".to_string(),
        )
    }

    fn draft() -> ComplaintDraft {
        ComplaintDraft {
            issue_type: IssueType::Pothole,
            severity: Severity::High,
            department: "Roads & Highways Department".to_string(),
            description: "Large pothole on Mall Road".to_string(),
            district: "Lahore".to_string(),
            location: "Mall Road".to_string(),
            latitude: None,
            longitude: None,
            email: None,
            phone: None,
            image_ref: None,
        }
    }

    #[test]
    fn test_build_happy_path() {
        let complaint = builder().build(draft()).unwrap();
        assert!(complaint.tracking_id.starts_with("CIV-"));
        assert_eq!(complaint.status, Status::Pending);
    }

    #[test]
    fn test_empty_description_rejected() {
        let mut d = draft();
        d.description = "  ".to_string();
        let err = builder().build(d).unwrap_err();
        assert!(matches!(err, SubmitError::Validation { ref field, .. } if field == "description"));
    }

    #[test]
    fn test_unknown_district_rejected() {
        let mut d = draft();
        d.district = "Atlantis".to_string();
        let err = builder().build(d).unwrap_err();
        assert!(matches!(err, SubmitError::Validation { ref field, .. } if field == "district"));
    }

    #[test]
    fn test_district_check_is_case_insensitive() {
        let mut d = draft();
        d.district = "lahore".to_string();
        assert!(builder().build(d).is_ok());
    }

    #[test]
    fn test_bad_email_rejected() {
        let mut d = draft();
        d.email = Some("not-an-email".to_string());
        let err = builder().build(d).unwrap_err();
        assert!(matches!(err, SubmitError::Validation { ref field, .. } if field == "email"));
    }

    #[test]
    fn test_email_normalized() {
        let mut d = draft();
        d.email = Some("  Citizen@Example.PK ".to_string());
        let complaint = builder().build(d).unwrap();
        assert_eq!(complaint.email.as_deref(), Some("citizen@example.pk"));
    }

    #[test]
    fn test_phone_validation() {
        let mut d = draft();
        d.phone = Some("+92 300 1234567".to_string());
        assert!(builder().build(d).is_ok());

        let mut d = draft();
        d.phone = Some("call me maybe".to_string());
        let err = builder().build(d).unwrap_err();
        assert!(matches!(err, SubmitError::Validation { ref field, .. } if field == "phone"));

        let mut d = draft();
        d.phone = Some("123".to_string());
        assert!(builder().build(d).is_err());
    }
}
