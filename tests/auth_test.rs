use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::ServiceExt;

use lead_intake::agent::{AgentDirectory, AgentSource};
use lead_intake::database::{init_db, AppState};
use lead_intake::route::create_app;
use lead_intake::transform::LeadTransformer;

fn setup_test_app(webhook_token: Option<&str>) -> (axum::Router, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_db.path().to_str().unwrap();
    let store = Arc::new(init_db(db_path).expect("Failed to initialize test database"));
    let state = AppState {
        store: store.clone(),
        transformer: LeadTransformer::new(
            store,
            Arc::new(AgentDirectory::default()),
            AgentSource::FromSubmission,
        ),
        webhook_token: webhook_token.map(str::to_string),
    };
    (create_app(state), temp_db)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

fn campaign_request(authorization: Option<&str>) -> Request<Body> {
    let payload = json!({
        "phoneNumber": "+911234567890",
        "name": "A Kumar",
        "campaign": true,
        "projectName": "DSR The Address"
    });

    let mut builder = Request::builder()
        .method("POST")
        .uri("/handleMultipleCampaignData")
        .header("content-type", "application/json");
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

#[tokio::test]
async fn test_auth_enabled_valid_token() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app
        .oneshot(campaign_request(Some("secret_token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_auth_enabled_bearer_token() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app
        .oneshot(campaign_request(Some("Bearer secret_token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_auth_enabled_invalid_token() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app
        .oneshot(campaign_request(Some("wrong_token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_auth_enabled_missing_header() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app.oneshot(campaign_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_disabled() {
    let (app, _temp_db) = setup_test_app(None);

    let response = app.oneshot(campaign_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_health_is_not_guarded() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
