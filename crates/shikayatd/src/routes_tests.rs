//! End-to-end HTTP tests against the assembled router.
//!
//! State is wired by hand with no geocoder and a no-op notifier so
//! nothing leaves the process.

use crate::server::{router, AppState, Session};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use shikayat_common::auth::{hash_password, Principal, StoreAuthenticator};
use shikayat_common::classify::ComplaintClassifier;
use shikayat_common::config::ShikayatConfig;
use shikayat_common::lifecycle::LifecycleManager;
use shikayat_common::notify::NullNotifier;
use shikayat_common::pipeline::SubmissionPipeline;
use shikayat_common::store::ComplaintStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

fn test_state() -> Arc<AppState> {
    let config = ShikayatConfig::seeded_default();
    let store = Arc::new(ComplaintStore::open_in_memory().unwrap());
    store
        .insert_admin("admin", &hash_password("hunter2"), "Test Admin", "admin")
        .unwrap();

    let classifier = Arc::new(ComplaintClassifier::new(None, None, None));
    let notifier = Arc::new(NullNotifier);
    let pipeline = Arc::new(SubmissionPipeline::new(
        &config,
        classifier,
        None,
        Arc::clone(&store),
        notifier.clone(),
        None,
    ));
    let lifecycle = Arc::new(LifecycleManager::new(Arc::clone(&store), notifier));
    let authenticator = Arc::new(StoreAuthenticator::new(Arc::clone(&store)));

    Arc::new(AppState {
        store,
        pipeline,
        lifecycle,
        authenticator,
        sessions: RwLock::new(HashMap::new()),
    })
}

fn test_router() -> Router {
    router(test_state())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    send_json_with_token(app, method, uri, body, None).await
}

async fn send_json_with_token(
    app: &Router,
    method: &str,
    uri: &str,
    body: Value,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn submit_body(text: &str) -> Value {
    json!({
        "text": text,
        "district": "Lahore",
        "location": "Mall Road",
        "email": "citizen@example.com",
    })
}

#[tokio::test]
async fn test_submit_and_track() {
    let app = test_router();

    let (status, receipt) = send_json(
        &app,
        "POST",
        "/v1/complaints",
        submit_body("There is a deep pothole on Mall Road near the bank"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["issue_type"], "Pothole");
    assert_eq!(receipt["severity"], "High");
    assert_eq!(receipt["status"], "Pending");

    let tracking_id = receipt["tracking_id"].as_str().unwrap();
    assert!(tracking_id.starts_with("CIV-"));

    let (status, complaint) = get(&app, &format!("/v1/complaints/{}", tracking_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(complaint["district"], "Lahore");
    assert_eq!(complaint["issue_type"], "Pothole");
}

#[tokio::test]
async fn test_submit_without_input_rejected() {
    let app = test_router();
    let (status, _) = send_json(
        &app,
        "POST",
        "/v1/complaints",
        json!({ "district": "Lahore", "location": "Mall Road" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_submit_unknown_district_rejected() {
    let app = test_router();
    let (status, _) = send_json(
        &app,
        "POST",
        "/v1/complaints",
        json!({
            "text": "garbage everywhere",
            "district": "Atlantis",
            "location": "Main St",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unknown_tracking_id_is_404() {
    let app = test_router();
    let (status, _) = get(&app, "/v1/complaints/CIV-NOPE1234").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/v1/complaints/not-even-an-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_with_filters() {
    let app = test_router();
    send_json(
        &app,
        "POST",
        "/v1/complaints",
        submit_body("pothole near the school gate"),
    )
    .await;
    send_json(
        &app,
        "POST",
        "/v1/complaints",
        json!({
            "text": "garbage pile rotting on the corner",
            "district": "Multan",
            "location": "Bosan Road",
        }),
    )
    .await;

    let (status, all) = get(&app, "/v1/complaints").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, lahore) = get(&app, "/v1/complaints?district=Lahore").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lahore.as_array().unwrap().len(), 1);

    let (status, _) = get(&app, "/v1/complaints?status=Flying").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_admin_login_and_transition() {
    let app = test_router();
    let (_, receipt) = send_json(
        &app,
        "POST",
        "/v1/complaints",
        submit_body("streetlight has been dark for a week"),
    )
    .await;
    let tracking_id = receipt["tracking_id"].as_str().unwrap().to_string();

    let (status, login) = send_json(
        &app,
        "POST",
        "/v1/admin/login",
        json!({ "username": "admin", "password": "hunter2" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["token"].as_str().unwrap().to_string();
    assert_eq!(login["principal"]["username"], "admin");

    let uri = format!("/v1/admin/complaints/{}/status", tracking_id);

    // No token: rejected.
    let (status, _) = send_json(
        &app,
        "POST",
        &uri,
        json!({ "new_status": "Under Review", "note": "triage" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, update) = send_json_with_token(
        &app,
        "POST",
        &uri,
        json!({ "new_status": "Under Review", "note": "triage" }),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(update["old_status"], "Pending");
    assert_eq!(update["new_status"], "Under Review");

    // Moving back to Pending is not a legal edge.
    let (status, _) = send_json_with_token(
        &app,
        "POST",
        &uri,
        json!({ "new_status": "Pending", "note": "" }),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, history) = get(&app, &format!("/v1/complaints/{}/history", tracking_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_expired_session_rejected() {
    let state = test_state();
    let app = router(Arc::clone(&state));
    let (_, receipt) = send_json(
        &app,
        "POST",
        "/v1/complaints",
        submit_body("pothole outside the clinic"),
    )
    .await;
    let tracking_id = receipt["tracking_id"].as_str().unwrap().to_string();

    state.sessions.write().await.insert(
        "stale-token".to_string(),
        Session {
            principal: Principal {
                id: 1,
                username: "admin".to_string(),
                full_name: "Test Admin".to_string(),
                role: "admin".to_string(),
            },
            expires_at: chrono::Utc::now() - chrono::Duration::hours(1),
        },
    );

    let (status, _) = send_json_with_token(
        &app,
        "POST",
        &format!("/v1/admin/complaints/{}/status", tracking_id),
        json!({ "new_status": "Under Review", "note": "" }),
        Some("stale-token"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_login_is_401() {
    let app = test_router();
    let (status, _) = send_json(
        &app,
        "POST",
        "/v1/admin/login",
        json!({ "username": "admin", "password": "wrong" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_csv_export() {
    let app = test_router();
    send_json(
        &app,
        "POST",
        "/v1/complaints",
        submit_body("sewage overflowing onto the street"),
    )
    .await;

    let request = Request::builder()
        .uri("/v1/export/csv")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/csv"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("tracking_id,"));
    assert!(text.contains("Sewage Overflow"));
}

#[tokio::test]
async fn test_pdf_document_export() {
    let app = test_router();
    let (_, receipt) = send_json(
        &app,
        "POST",
        "/v1/complaints",
        submit_body("broken streetlight on the corner"),
    )
    .await;
    let tracking_id = receipt["tracking_id"].as_str().unwrap();

    let request = Request::builder()
        .uri(format!("/v1/complaints/{}/document", tracking_id))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn test_stats_and_health() {
    let app = test_router();
    send_json(
        &app,
        "POST",
        "/v1/complaints",
        submit_body("water leaking from a burst pipe"),
    )
    .await;

    let (status, stats) = get(&app, "/v1/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["by_status"]["Pending"], 1);

    let (status, health) = get(&app, "/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
}
