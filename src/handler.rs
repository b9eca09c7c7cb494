//! HTTP request handlers for the lead intake API
//!
//! - Accepting campaign submissions and turning them into records
//! - Reporting service health
//! - Describing the available endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::database::AppState;
use crate::error::AppError;
use crate::model::{CampaignResponse, CreatedSummary};
use crate::validation::parse_submissions;

fn connection_status(state: &AppState) -> &'static str {
    if state.store.ping() {
        "Connected"
    } else {
        "Not Connected"
    }
}

/// Accepts one campaign submission or a batch of them
///
/// This handler:
/// 1. Validates every submission, rejecting the whole request on the first error
/// 2. Stages the raw submissions
/// 3. Runs the lead transformer (duplicate check, id allocation, enrichment)
/// 4. Persists the resulting user, lead and enquiry records
///
/// # Request Body
///
/// ```json
/// {
///   "phoneNumber": "+911234567890",
///   "name": "A Kumar",
///   "campaign": true,
///   "projectName": "DSR The Address",
///   "utmDetails": {}
/// }
/// ```
///
/// # Response
///
/// - **201 Created** - At least one new lead was recorded
/// - **200 OK** - Every submission was a duplicate
/// - **400 Bad Request** - Missing or malformed fields
/// - **500 Internal Server Error** - Store failure, `{error, details}`
pub async fn handle_campaign_data(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = parse_submissions(&body)?;
    let now = Utc::now().timestamp();

    state.store.stage_submissions(&submissions, now)?;

    let records = state.transformer.transform_at(&submissions, now)?;
    state.store.persist(&records)?;

    let skipped = submissions.len() - records.len();
    let created: Vec<CreatedSummary> = records.iter().map(CreatedSummary::from).collect();

    let (status, message) = if created.is_empty() {
        (
            StatusCode::OK,
            "Duplicate lead(s) ignored, no new records created.".to_string(),
        )
    } else {
        (
            StatusCode::CREATED,
            format!("{} lead(s) created, {} duplicate(s) skipped.", created.len(), skipped),
        )
    };

    tracing::info!("{}", message);
    Ok((
        status,
        Json(CampaignResponse {
            message,
            created,
            skipped,
        }),
    ))
}

/// Liveness endpoint reporting store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "store": connection_status(&state),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Root endpoint listing the available routes
pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "message": "Lead Intake Webhook",
        "status": "Running",
        "store": connection_status(&state),
        "endpoints": {
            "health": "/health",
            "campaign": "/handleMultipleCampaignData"
        }
    }))
}
