//! Shikayat Common - Shared domain logic for the civic complaint service.
//!
//! Covers the complaint lifecycle end to end: multi-modal classification,
//! enrichment, record building, SQLite persistence, status transitions with
//! audit history, and best-effort notifications.

pub mod auth;
pub mod builder;
pub mod classify;
pub mod config;
pub mod enrich;
pub mod error;
pub mod export;
pub mod formal;
pub mod geocode;
pub mod lifecycle;
pub mod notify;
pub mod pipeline;
pub mod store;
pub mod tracking;
pub mod types;

#[cfg(test)]
mod pipeline_tests;

pub use error::{AuthError, SubmitError, TransitionError};
pub use types::{
    Complaint, ComplaintFilters, ComplaintStats, ComplaintUpdate, IssueType, Severity, Status,
};
