//! API routes for shikayatd.
//!
//! Citizen surface: submit, track, history. Admin surface: login plus
//! status transitions, Bearer-guarded. Export surface: CSV and PDF.
//! Validation errors map to 422, missing records to 404, illegal or stale
//! transitions to 409. Classifier and notifier failures never surface
//! here; the pipeline degrades instead.

use crate::server::{AppState, Session, SESSION_TTL_HOURS};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use shikayat_common::auth::{Credentials, Principal};
use shikayat_common::error::{SubmitError, TransitionError};
use shikayat_common::export;
use shikayat_common::formal::Language;
use shikayat_common::pipeline::{ReportInput, Submission, SubmissionReceipt};
use shikayat_common::tracking::looks_like_tracking_id;
use shikayat_common::types::{
    Complaint, ComplaintFilters, ComplaintStats, ComplaintUpdate, IssueType, Severity, Status,
};
use std::sync::Arc;
use tracing::{error, info};

type AppStateArc = Arc<AppState>;
type ApiError = (StatusCode, String);

fn internal(context: &str, e: impl std::fmt::Display) -> ApiError {
    error!("{}: {}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
}

// ============================================================================
// Citizen Routes
// ============================================================================

pub fn citizen_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/complaints", post(submit_complaint).get(list_complaints))
        .route("/v1/complaints/:tracking_id", get(get_complaint))
        .route("/v1/complaints/:tracking_id/history", get(get_history))
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    text: Option<String>,
    image_base64: Option<String>,
    audio_base64: Option<String>,
    audio_language: Option<String>,
    district: String,
    location: String,
    email: Option<String>,
    phone: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

impl SubmitRequest {
    fn into_submission(self) -> Result<Submission, ApiError> {
        let input = if let Some(image) = &self.image_base64 {
            let bytes = decode_base64("image_base64", image)?;
            ReportInput::Image(bytes)
        } else if let Some(audio) = &self.audio_base64 {
            let bytes = decode_base64("audio_base64", audio)?;
            ReportInput::Audio {
                bytes,
                language: self.audio_language.clone(),
            }
        } else if let Some(text) = &self.text {
            ReportInput::Text(text.clone())
        } else {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                "one of text, image_base64, or audio_base64 is required".to_string(),
            ));
        };

        Ok(Submission {
            attach_image: matches!(input, ReportInput::Image(_)),
            input,
            district: self.district,
            location: self.location,
            email: self.email,
            phone: self.phone,
            language: Language::parse(self.language.as_deref().unwrap_or("english")),
        })
    }
}

fn decode_base64(field: &str, payload: &str) -> Result<Vec<u8>, ApiError> {
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("{}: invalid base64: {}", field, e),
            )
        })
}

async fn submit_complaint(
    State(state): State<AppStateArc>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmissionReceipt>), ApiError> {
    let submission = req.into_submission()?;
    let pipeline = Arc::clone(&state.pipeline);

    let receipt = tokio::task::spawn_blocking(move || pipeline.submit(submission))
        .await
        .map_err(|e| internal("submission task failed", e))?
        .map_err(submit_error)?;

    info!("  Complaint {} accepted", receipt.tracking_id);
    Ok((StatusCode::CREATED, Json(receipt)))
}

fn submit_error(e: SubmitError) -> ApiError {
    match e {
        SubmitError::Validation { field, message } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("{}: {}", field, message),
        ),
        SubmitError::Store(e) => internal("storage failure during submission", e),
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    district: Option<String>,
    status: Option<String>,
    severity: Option<String>,
    issue_type: Option<String>,
}

impl ListParams {
    fn into_filters(self) -> Result<ComplaintFilters, ApiError> {
        let bad = |field: &str, value: &str| {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("{}: unknown value '{}'", field, value),
            )
        };
        let status = match &self.status {
            Some(s) => Some(Status::parse(s).ok_or_else(|| bad("status", s))?),
            None => None,
        };
        let severity = match &self.severity {
            Some(s) => Some(Severity::parse(s).ok_or_else(|| bad("severity", s))?),
            None => None,
        };
        let issue_type = match &self.issue_type {
            Some(s) => Some(IssueType::parse(s).ok_or_else(|| bad("issue_type", s))?),
            None => None,
        };
        Ok(ComplaintFilters {
            district: self.district,
            status,
            severity,
            issue_type,
        })
    }
}

async fn list_complaints(
    State(state): State<AppStateArc>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    let filters = params.into_filters()?;
    let store = Arc::clone(&state.store);
    let complaints = tokio::task::spawn_blocking(move || store.list(&filters))
        .await
        .map_err(|e| internal("list task failed", e))?
        .map_err(|e| internal("failed to list complaints", e))?;
    Ok(Json(complaints))
}

async fn get_complaint(
    State(state): State<AppStateArc>,
    Path(tracking_id): Path<String>,
) -> Result<Json<Complaint>, ApiError> {
    let complaint = fetch_complaint(&state, tracking_id).await?;
    Ok(Json(complaint))
}

async fn get_history(
    State(state): State<AppStateArc>,
    Path(tracking_id): Path<String>,
) -> Result<Json<Vec<ComplaintUpdate>>, ApiError> {
    // 404 for unknown ids instead of an empty history.
    fetch_complaint(&state, tracking_id.clone()).await?;
    let store = Arc::clone(&state.store);
    let history = tokio::task::spawn_blocking(move || store.history(&tracking_id))
        .await
        .map_err(|e| internal("history task failed", e))?
        .map_err(|e| internal("failed to fetch history", e))?;
    Ok(Json(history))
}

async fn fetch_complaint(state: &AppStateArc, tracking_id: String) -> Result<Complaint, ApiError> {
    if !looks_like_tracking_id(&tracking_id) {
        return Err((
            StatusCode::NOT_FOUND,
            format!("no complaint with tracking id '{}'", tracking_id),
        ));
    }
    let store = Arc::clone(&state.store);
    let id = tracking_id.clone();
    tokio::task::spawn_blocking(move || store.get(&id))
        .await
        .map_err(|e| internal("lookup task failed", e))?
        .map_err(|e| internal("failed to fetch complaint", e))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("no complaint with tracking id '{}'", tracking_id),
            )
        })
}

// ============================================================================
// Admin Routes
// ============================================================================

pub fn admin_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/admin/login", post(admin_login))
        .route(
            "/v1/admin/complaints/:tracking_id/status",
            post(transition_status),
        )
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    principal: Principal,
}

async fn admin_login(
    State(state): State<AppStateArc>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let authenticator = Arc::clone(&state.authenticator);
    let credentials = Credentials {
        username: req.username,
        password: req.password,
    };
    let principal = tokio::task::spawn_blocking(move || authenticator.authenticate(&credentials))
        .await
        .map_err(|e| internal("login task failed", e))?
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let token = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now();
    let mut sessions = state.sessions.write().await;
    // Sweep expired tokens so the map cannot grow unbounded.
    sessions.retain(|_, s| s.expires_at > now);
    sessions.insert(
        token.clone(),
        Session {
            principal: principal.clone(),
            expires_at: now + chrono::Duration::hours(SESSION_TTL_HOURS),
        },
    );
    drop(sessions);

    Ok(Json(LoginResponse { token, principal }))
}

async fn require_admin(state: &AppStateArc, headers: &HeaderMap) -> Result<Principal, ApiError> {
    let unauthorized = || {
        (
            StatusCode::UNAUTHORIZED,
            "missing or invalid session token".to_string(),
        )
    };
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(unauthorized)?;
    match state.sessions.read().await.get(token) {
        Some(s) if s.expires_at > chrono::Utc::now() => Ok(s.principal.clone()),
        _ => Err(unauthorized()),
    }
}

#[derive(Debug, Deserialize)]
struct TransitionRequest {
    new_status: String,
    #[serde(default)]
    note: String,
}

async fn transition_status(
    State(state): State<AppStateArc>,
    Path(tracking_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<ComplaintUpdate>, ApiError> {
    let principal = require_admin(&state, &headers).await?;

    let new_status = Status::parse(&req.new_status).ok_or_else(|| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("new_status: unknown status '{}'", req.new_status),
        )
    })?;

    let lifecycle = Arc::clone(&state.lifecycle);
    let actor = principal.username.clone();
    let update = tokio::task::spawn_blocking(move || {
        lifecycle.transition(&tracking_id, new_status, &req.note, &actor)
    })
    .await
    .map_err(|e| internal("transition task failed", e))?
    .map_err(transition_error)?;

    Ok(Json(update))
}

fn transition_error(e: TransitionError) -> ApiError {
    match e {
        TransitionError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            format!("no complaint with tracking id '{}'", id),
        ),
        TransitionError::InvalidTransition { .. } | TransitionError::Conflict { .. } => {
            (StatusCode::CONFLICT, e.to_string())
        }
        TransitionError::Store(e) => internal("storage failure during transition", e),
    }
}

// ============================================================================
// Export Routes
// ============================================================================

pub fn export_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/export/csv", get(export_csv))
        .route("/v1/complaints/:tracking_id/document", get(export_document))
        .route("/v1/stats", get(stats))
}

async fn export_csv(State(state): State<AppStateArc>) -> Result<impl IntoResponse, ApiError> {
    let store = Arc::clone(&state.store);
    let complaints = tokio::task::spawn_blocking(move || store.list(&ComplaintFilters::default()))
        .await
        .map_err(|e| internal("export task failed", e))?
        .map_err(|e| internal("failed to list complaints", e))?;

    let csv = export::complaints_to_csv(&complaints);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"complaints.csv\"",
            ),
        ],
        csv,
    ))
}

async fn export_document(
    State(state): State<AppStateArc>,
    Path(tracking_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let complaint = fetch_complaint(&state, tracking_id).await?;
    let bytes = tokio::task::spawn_blocking(move || export::complaint_document(&complaint))
        .await
        .map_err(|e| internal("document task failed", e))?
        .map_err(|e| internal("failed to generate document", e))?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes))
}

async fn stats(State(state): State<AppStateArc>) -> Result<Json<ComplaintStats>, ApiError> {
    let store = Arc::clone(&state.store);
    let stats = tokio::task::spawn_blocking(move || store.stats())
        .await
        .map_err(|e| internal("stats task failed", e))?
        .map_err(|e| internal("failed to compute stats", e))?;
    Ok(Json(stats))
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
