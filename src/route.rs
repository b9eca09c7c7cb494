//! Route definitions for the lead intake API

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::database::AppState;
use crate::handler::{handle_campaign_data, health, root};
use crate::middleware::webhook_auth;

/// Creates the application router
///
/// # Route Definitions
///
/// - `GET /` - Service description and endpoint list
/// - `GET /health` - Liveness and store connectivity
/// - `POST /handleMultipleCampaignData` - Campaign webhook (token-guarded when configured)
pub fn create_app(state: AppState) -> Router {
    let webhook_routes = Router::new()
        .route("/handleMultipleCampaignData", post(handle_campaign_data))
        .layer(middleware::from_fn_with_state(state.clone(), webhook_auth));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(webhook_routes)
        .with_state(state)
}
