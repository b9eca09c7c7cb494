//! Integration tests for the lead intake API
//!
//! These tests drive the full router against a temporary database:
//! - Validation of inbound submissions
//! - Lead creation and duplicate handling
//! - Health and root endpoints

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
use lead_intake::database::{
    init_db, AppState, Store, TABLE_COUNTERS, TABLE_ENQUIRIES, TABLE_USERS,
};
use lead_intake::model::PropertyRecord;
use lead_intake::route::create_app;
use lead_intake::transform::LeadTransformer;

/// Helper function to create a test application with a temporary database
fn setup_test_app() -> (axum::Router, Arc<Store>, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_db.path().to_str().unwrap();

    let store = Arc::new(init_db(db_path).expect("Failed to initialize test database"));
    store
        .seed_properties(&[PropertyRecord {
            property_id: "prop002".to_string(),
            project_name: "DSR The Address".to_string(),
        }])
        .unwrap();

    let state = AppState {
        store: store.clone(),
        transformer: LeadTransformer::new(
            store.clone(),
            Arc::new(AgentDirectory::default()),
            AgentSource::FromSubmission,
        ),
        webhook_token: None,
    };

    (create_app(state), store, temp_db)
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

fn campaign_request(payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/handleMultipleCampaignData")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn sample_submission() -> Value {
    json!({
        "phoneNumber": "+911234567890",
        "name": "A Kumar",
        "campaign": true,
        "projectName": "DSR The Address",
        "utmDetails": {}
    })
}

#[tokio::test]
async fn test_create_lead_success() {
    let (app, store, _temp_db) = setup_test_app();

    let response = app.oneshot(campaign_request(&sample_submission())).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["skipped"], 0);
    assert_eq!(body["created"][0]["userId"], "user001");
    assert_eq!(body["created"][0]["leadId"], "lead001");
    assert_eq!(body["created"][0]["enquiryId"], "enq001");
    assert_eq!(body["created"][0]["alreadyExists"], false);

    let user = store.get_document(TABLE_USERS, "user001").unwrap().unwrap();
    assert_eq!(user["phoneNumber"], "+911234567890");

    let enquiry = store.get_document(TABLE_ENQUIRIES, "enq001").unwrap().unwrap();
    assert_eq!(enquiry["state"], "fresh");
    assert_eq!(enquiry["stage"], Value::Null);
    assert_eq!(enquiry["propertyId"], "prop002");
    assert_eq!(enquiry["propertyName"], "dsr the address");
    assert_eq!(enquiry["agentName"], "unknown");
    assert_eq!(enquiry["agentHistory"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_resubmission_is_ignored_as_duplicate() {
    let (app, _store, _temp_db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(campaign_request(&sample_submission()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let mut again = sample_submission();
    again["projectName"] = json!("dsr the address");
    let response = app.oneshot(campaign_request(&again)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["created"].as_array().unwrap().len(), 0);
    assert_eq!(body["skipped"], 1);
}

#[tokio::test]
async fn test_existing_user_gets_new_enquiry() {
    let (app, _store, _temp_db) = setup_test_app();

    app.clone()
        .oneshot(campaign_request(&sample_submission()))
        .await
        .unwrap();

    let mut other_project = sample_submission();
    other_project["projectName"] = json!("Sattva Aeropolis");
    let response = app.oneshot(campaign_request(&other_project)).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["created"][0]["userId"], "user001");
    assert_eq!(body["created"][0]["enquiryId"], "enq002");
    assert_eq!(body["created"][0]["alreadyExists"], true);
}

#[tokio::test]
async fn test_batch_submission() {
    let (app, _store, _temp_db) = setup_test_app();

    let payload = json!([
        sample_submission(),
        sample_submission(),
        {
            "phoneNumber": "+919876543210",
            "name": "B Rao",
            "campaign": false,
            "projectName": "Sattva Aeropolis",
            "currentAgent": "Rohit",
            "currentAgentId": "agent042"
        }
    ]);

    let response = app.oneshot(campaign_request(&payload)).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["created"].as_array().unwrap().len(), 2);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["created"][1]["userId"], "user002");
}

#[tokio::test]
async fn test_missing_fields_are_named() {
    let (app, _store, _temp_db) = setup_test_app();

    let payload = json!({
        "phoneNumber": "+911234567890",
        "name": ""
    });

    let response = app.oneshot(campaign_request(&payload)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response.into_body()).await;
    let missing: Vec<&str> = body["missing"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(missing, vec!["name", "campaign", "projectName"]);
    assert!(body["error"].as_str().unwrap().contains("projectName"));
}

#[tokio::test]
async fn test_non_string_name_is_rejected() {
    let (app, _store, _temp_db) = setup_test_app();

    let mut payload = sample_submission();
    payload["name"] = json!(42);

    let response = app.oneshot(campaign_request(&payload)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["error"], "phoneNumber and name must be strings.");
}

#[tokio::test]
async fn test_non_boolean_campaign_is_rejected() {
    let (app, _store, _temp_db) = setup_test_app();

    let mut payload = sample_submission();
    payload["campaign"] = json!("yes");

    let response = app.oneshot(campaign_request(&payload)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_short_phone_number_fails_validation() {
    let (app, _store, _temp_db) = setup_test_app();

    let mut payload = sample_submission();
    payload["phoneNumber"] = json!("123");

    let response = app.oneshot(campaign_request(&payload)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["error"], "One or more fields are invalid");
    assert_eq!(body["details"].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_batch_writes_nothing() {
    let (app, store, _temp_db) = setup_test_app();

    let payload = json!([sample_submission(), { "phoneNumber": "+919876543210" }]);

    let response = app.oneshot(campaign_request(&payload)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.counter_value("admin/lastUser").unwrap(), 0);
    assert!(store.get_document(TABLE_USERS, "user001").unwrap().is_none());
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let (app, _store, _temp_db) = setup_test_app();

    let response = app.oneshot(campaign_request(&json!([]))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_store_status() {
    let (app, _store, _temp_db) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["store"], "Connected");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (app, _store, _temp_db) = setup_test_app();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["endpoints"]["health"], "/health");
    assert_eq!(body["endpoints"]["campaign"], "/handleMultipleCampaignData");
}

#[tokio::test]
async fn test_corrupt_counter_returns_server_error() {
    let (app, store, _temp_db) = setup_test_app();

    let write_txn = store.database().begin_write().unwrap();
    {
        let mut table = write_txn.open_table(TABLE_COUNTERS).unwrap();
        table.insert("admin/lastUser", "not json").unwrap();
    }
    write_txn.commit().unwrap();

    let response = app.oneshot(campaign_request(&sample_submission())).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response.into_body()).await;
    assert!(body["error"].is_string());
    assert_eq!(body["details"], "Failed to process campaign data");

    assert!(store.get_document(TABLE_ENQUIRIES, "enq001").unwrap().is_none());
}

#[tokio::test]
async fn test_campaign_lead_gets_follow_up_task() {
    let (app, store, _temp_db) = setup_test_app();

    let response = app.oneshot(campaign_request(&sample_submission())).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let user = store.get_document(TABLE_USERS, "user001").unwrap().unwrap();
    assert_eq!(user["campaignDetails"]["subSource"], "Google Search");
    assert_eq!(user["campaignDetails"]["sharedProperties"][0]["id"], "prop002");

    let enquiry = store.get_document(TABLE_ENQUIRIES, "enq001").unwrap().unwrap();
    let tasks = enquiry["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["taskName"], "Collect Requirement");
    assert_eq!(tasks[0]["type"], "Customer");
}
