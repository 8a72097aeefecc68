//! Error taxonomy for the complaint pipeline.
//!
//! Validation and transition errors propagate to the caller for display.
//! Classification and notification failures are absorbed at their layer and
//! degrade gracefully; they never appear here as submission failures.

use crate::types::Status;

/// Errors surfaced to the citizen during submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Bad field format or missing required field, with field-level detail.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("storage error: {0}")]
    Store(#[from] anyhow::Error),
}

impl SubmitError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        SubmitError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Errors surfaced to the admin during a status change.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("complaint {0} not found")]
    NotFound(String),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: Status, to: Status },

    /// The status read before the transition no longer matches what is
    /// stored; a more recent change won the race.
    #[error("stale status: expected {expected}, found {found}")]
    Conflict { expected: Status, found: Status },

    #[error("storage error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Authentication failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("authentication backend error: {0}")]
    Backend(String),
}
