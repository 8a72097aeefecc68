//! Notification dispatcher.
//!
//! Email goes out through a SendGrid-style HTTP API; SMS is a logged
//! simulation until a real gateway is wired in. Dispatch is fire-and-forget:
//! failures are logged and recorded in notifications_log, and never block
//! complaint creation or a status transition.

use crate::config::NotifySettings;
use crate::store::ComplaintStore;
use crate::types::{Complaint, Status};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotifyError {
    #[error("notifications disabled")]
    Disabled,

    #[error("no API key configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    HttpError(String),
}

/// What happened, for subject lines and the notification log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Confirmation,
    StatusChange,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Confirmation => "confirmation",
            EventKind::StatusChange => "status_change",
        }
    }
}

/// A rendered notification ready to send.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub tracking_id: String,
    pub subject: String,
    pub body_html: String,
    pub sms_text: String,
}

impl NotificationEvent {
    /// Submission confirmation with the tracking id the citizen will quote.
    pub fn confirmation(complaint: &Complaint) -> Self {
        let subject = format!("Complaint Submitted - {}", complaint.tracking_id);
        let body_html = format!(
            "<html><body>\
             <h2>Complaint Received</h2>\
             <p>Your complaint has been registered successfully.</p>\
             <p><b>Tracking ID:</b> {id}<br>\
             <b>Issue:</b> {issue}<br>\
             <b>Location:</b> {location}, {district}</p>\
             <p>Use your tracking ID to check the status at any time.</p>\
             </body></html>",
            id = complaint.tracking_id,
            issue = complaint.issue_type,
            location = complaint.location,
            district = complaint.district,
        );
        let sms_text = format!(
            "Shikayat: complaint {} registered ({}). Track with this ID.",
            complaint.tracking_id, complaint.issue_type
        );
        Self {
            kind: EventKind::Confirmation,
            tracking_id: complaint.tracking_id.clone(),
            subject,
            body_html,
            sms_text,
        }
    }

    /// Status-change notice after an admin transition.
    pub fn status_change(complaint: &Complaint, old_status: Status, new_status: Status) -> Self {
        let subject = format!("Complaint Update - {}", complaint.tracking_id);
        let body_html = format!(
            "<html><body>\
             <h2>Status Update</h2>\
             <p><b>Tracking ID:</b> {id}<br>\
             <b>Issue:</b> {issue}</p>\
             <p>Status changed from <b>{old}</b> to <b>{new}</b>.</p>\
             </body></html>",
            id = complaint.tracking_id,
            issue = complaint.issue_type,
            old = old_status,
            new = new_status,
        );
        let sms_text = format!(
            "Shikayat: complaint {} is now {}.",
            complaint.tracking_id, new_status
        );
        Self {
            kind: EventKind::StatusChange,
            tracking_id: complaint.tracking_id.clone(),
            subject,
            body_html,
            sms_text,
        }
    }
}

/// Notification recipient; fields are optional contact channels.
#[derive(Debug, Clone, Default)]
pub struct Recipient {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Recipient {
    pub fn of(complaint: &Complaint) -> Self {
        Self {
            email: complaint.email.clone(),
            phone: complaint.phone.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none()
    }

    fn label(&self) -> String {
        self.email
            .clone()
            .or_else(|| self.phone.clone())
            .unwrap_or_else(|| "-".to_string())
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: &Recipient, event: &NotificationEvent) -> Result<(), NotifyError>;
}

/// Email over the SendGrid v3 mail-send API, SMS simulated in the log.
pub struct HttpNotifier {
    settings: NotifySettings,
    client: reqwest::blocking::Client,
}

impl HttpNotifier {
    pub fn new(settings: NotifySettings) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| NotifyError::HttpError(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { settings, client })
    }

    fn send_email(&self, to: &str, event: &NotificationEvent) -> Result<(), NotifyError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(NotifyError::MissingApiKey)?;

        // Sender mismatches cause silent 403s; normalize aggressively.
        let payload = serde_json::json!({
            "personalizations": [{"to": [{"email": to.trim().to_lowercase()}]}],
            "from": {"email": self.settings.sender_email.trim().to_lowercase()},
            "subject": event.subject,
            "content": [{"type": "text/html", "value": event.body_html}],
        });

        let response = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .map_err(|e| NotifyError::HttpError(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(NotifyError::HttpError(format!(
                "HTTP {} from mail endpoint",
                response.status()
            )));
        }
        Ok(())
    }
}

impl Notifier for HttpNotifier {
    fn notify(&self, recipient: &Recipient, event: &NotificationEvent) -> Result<(), NotifyError> {
        if !self.settings.enabled {
            return Err(NotifyError::Disabled);
        }
        if let Some(email) = &recipient.email {
            self.send_email(email, event)?;
        }
        if let Some(phone) = &recipient.phone {
            // SMS gateway not wired yet; keep the trace so operators see it.
            info!("[sms simulation] to={} message={}", phone, event.sms_text);
        }
        Ok(())
    }
}

/// Notifier that records nothing and always succeeds. For tests and for
/// deployments with notifications turned off.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _: &Recipient, _: &NotificationEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Best-effort dispatch. Logs the outcome to notifications_log; any failure
/// is absorbed here.
pub fn dispatch(
    notifier: &dyn Notifier,
    store: &ComplaintStore,
    recipient: &Recipient,
    event: &NotificationEvent,
) {
    if recipient.is_empty() {
        return;
    }
    let log_status = match notifier.notify(recipient, event) {
        Ok(()) => {
            info!(
                "Notification '{}' sent for {}",
                event.kind.as_str(),
                event.tracking_id
            );
            "sent"
        }
        Err(e) => {
            warn!(
                "Notification '{}' failed for {}: {}",
                event.kind.as_str(),
                event.tracking_id,
                e
            );
            "failed"
        }
    };
    if let Err(e) = store.log_notification(
        &event.tracking_id,
        event.kind.as_str(),
        &recipient.label(),
        &event.subject,
        log_status,
    ) {
        warn!("Could not record notification log entry: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IssueType, Severity};
    use chrono::Utc;

    struct AlwaysFails;

    impl Notifier for AlwaysFails {
        fn notify(&self, _: &Recipient, _: &NotificationEvent) -> Result<(), NotifyError> {
            Err(NotifyError::HttpError("boom".to_string()))
        }
    }

    fn complaint() -> Complaint {
        Complaint {
            tracking_id: "CIV-TEST0001".to_string(),
            issue_type: IssueType::Garbage,
            severity: Severity::Medium,
            department: "Sanitation & Waste Management".to_string(),
            description: "overflowing bins".to_string(),
            district: "Lahore".to_string(),
            location: "Anarkali".to_string(),
            latitude: None,
            longitude: None,
            status: Status::Pending,
            email: Some("citizen@example.pk".to_string()),
            phone: None,
            image_ref: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_confirmation_event_mentions_tracking_id() {
        let event = NotificationEvent::confirmation(&complaint());
        assert!(event.subject.contains("CIV-TEST0001"));
        assert!(event.body_html.contains("Garbage"));
    }

    #[test]
    fn test_dispatch_failure_is_absorbed_and_logged() {
        let store = ComplaintStore::open_in_memory().unwrap();
        let c = complaint();
        let event = NotificationEvent::confirmation(&c);
        // Must not panic or propagate the failure.
        dispatch(&AlwaysFails, &store, &Recipient::of(&c), &event);
    }

    #[test]
    fn test_dispatch_skips_empty_recipient() {
        let store = ComplaintStore::open_in_memory().unwrap();
        let mut c = complaint();
        c.email = None;
        let event = NotificationEvent::confirmation(&c);
        dispatch(&NullNotifier, &store, &Recipient::of(&c), &event);
    }
}
