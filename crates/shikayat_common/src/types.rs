//! Core complaint data model.
//!
//! Complaints are created once by the citizen-facing pipeline, mutated only
//! through the status lifecycle manager, and never hard-deleted. Update rows
//! are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed enumeration of civic issue categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    Pothole,
    Garbage,
    #[serde(rename = "Water Leak")]
    WaterLeak,
    #[serde(rename = "Broken Streetlight")]
    BrokenStreetlight,
    #[serde(rename = "Damaged Road")]
    DamagedRoad,
    #[serde(rename = "Illegal Dumping")]
    IllegalDumping,
    #[serde(rename = "Sewage Overflow")]
    SewageOverflow,
    Other,
}

impl IssueType {
    /// Every variant, for totality checks and prompt construction.
    pub const ALL: [IssueType; 8] = [
        IssueType::Pothole,
        IssueType::Garbage,
        IssueType::WaterLeak,
        IssueType::BrokenStreetlight,
        IssueType::DamagedRoad,
        IssueType::IllegalDumping,
        IssueType::SewageOverflow,
        IssueType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Pothole => "Pothole",
            IssueType::Garbage => "Garbage",
            IssueType::WaterLeak => "Water Leak",
            IssueType::BrokenStreetlight => "Broken Streetlight",
            IssueType::DamagedRoad => "Damaged Road",
            IssueType::IllegalDumping => "Illegal Dumping",
            IssueType::SewageOverflow => "Sewage Overflow",
            IssueType::Other => "Other",
        }
    }

    /// Parse from string (case-insensitive). Unknown labels return None;
    /// callers decide whether that degrades to `Other`.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().to_lowercase() == normalized)
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived urgency of a complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Complaint lifecycle states.
///
/// The lifecycle is ordered but not strictly linear: Rejected is reachable
/// from every non-terminal state. Resolved and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Pending,
    #[serde(rename = "Under Review")]
    UnderReview,
    Assigned,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Rejected,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Pending,
        Status::UnderReview,
        Status::Assigned,
        Status::InProgress,
        Status::Resolved,
        Status::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::UnderReview => "Under Review",
            Status::Assigned => "Assigned",
            Status::InProgress => "In Progress",
            Status::Resolved => "Resolved",
            Status::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|st| st.as_str().to_lowercase() == normalized)
    }

    /// No transition is permitted out of a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Resolved | Status::Rejected)
    }

    /// The explicit transition table. Everything not listed here is an
    /// invalid transition.
    pub fn allowed_successors(&self) -> &'static [Status] {
        match self {
            Status::Pending => &[
                Status::UnderReview,
                Status::Assigned,
                Status::InProgress,
                Status::Rejected,
            ],
            Status::UnderReview => &[Status::Assigned, Status::InProgress, Status::Rejected],
            Status::Assigned => &[Status::InProgress, Status::Resolved, Status::Rejected],
            Status::InProgress => &[Status::Resolved, Status::Rejected],
            Status::Resolved => &[],
            Status::Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, target: Status) -> bool {
        self.allowed_successors().contains(&target)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One citizen-submitted issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    /// Citizen-facing identifier, immutable once assigned.
    pub tracking_id: String,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub department: String,
    pub description: String,
    pub district: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: Status,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Opaque reference into the media blob store.
    pub image_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit entry for a status transition.
///
/// Rows are written exactly once per transition and never mutated or
/// deleted; ordering by `updated_at` reconstructs the full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplaintUpdate {
    pub tracking_id: String,
    pub old_status: Status,
    pub new_status: Status,
    pub note: String,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

/// Optional filters for complaint listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplaintFilters {
    pub district: Option<String>,
    pub status: Option<Status>,
    pub severity: Option<Severity>,
    pub issue_type: Option<IssueType>,
}

impl ComplaintFilters {
    pub fn is_empty(&self) -> bool {
        self.district.is_none()
            && self.status.is_none()
            && self.severity.is_none()
            && self.issue_type.is_none()
    }
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplaintStats {
    pub total: usize,
    pub by_status: HashMap<String, usize>,
    pub by_district: HashMap<String, usize>,
    pub by_severity: HashMap<String, usize>,
    pub by_type: HashMap<String, usize>,
}
