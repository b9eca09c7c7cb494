//! Error types for the lead intake service
//!
//! `StoreError` covers everything that can go wrong against the embedded
//! database, `ConfigError` covers startup configuration, and `AppError` is the
//! HTTP-facing error that handlers return.

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised by the document store
///
/// Each redb error kind gets its own variant so store code can use `?`
/// directly on every redb call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction failed: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("failed to open table: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("failed to commit transaction: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures while loading configuration at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by HTTP handlers
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{0}")]
    InvalidSubmission(String),

    #[error("One or more fields are invalid")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid or missing authorization header")]
    Unauthorized,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::MissingFields(fields) => {
                let body = Json(json!({
                    "error": format!("Missing required fields: {}", fields.join(", ")),
                    "missing": fields,
                }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            AppError::InvalidSubmission(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            AppError::Validation(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "One or more fields are invalid",
                    "details": details,
                }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Unauthorized",
                    "message": "Invalid or missing authorization header"
                })),
            )
                .into_response(),
            AppError::Store(e) => {
                tracing::error!("Error processing campaign data: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": e.to_string(),
                        "details": "Failed to process campaign data"
                    })),
                )
                    .into_response()
            }
        }
    }
}
