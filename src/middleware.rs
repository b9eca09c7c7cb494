use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::database::AppState;
use crate::error::AppError;

/// Middleware guarding the campaign webhook with a shared token
///
/// When `WEBHOOK_TOKEN` is configured, the request must carry an
/// `Authorization` header equal to the token, either raw or as
/// `Bearer <token>`. Without a configured token the check is skipped.
pub async fn webhook_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.webhook_token.as_deref() {
        let provided = headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.strip_prefix("Bearer ").unwrap_or(value));

        if provided != Some(expected) {
            tracing::warn!("Rejected webhook call with invalid authorization");
            return Err(AppError::Unauthorized);
        }
    }

    Ok(next.run(request).await)
}
