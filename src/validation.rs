//! Intake validation for campaign submissions
//!
//! Runs before the transform: a structural pass over the raw JSON that names
//! missing fields and rejects wrongly typed ones, then deserialization into
//! [`Submission`] and its field constraints.

use serde_json::Value;
use validator::Validate;

use crate::error::AppError;
use crate::model::Submission;

/// Fields that must be present, non-null and non-empty
pub const REQUIRED_FIELDS: [&str; 4] = ["phoneNumber", "name", "campaign", "projectName"];

/// Parses a webhook body holding one submission object or an array of them
pub fn parse_submissions(body: &Value) -> Result<Vec<Submission>, AppError> {
    match body {
        Value::Array(items) if items.is_empty() => Err(AppError::InvalidSubmission(
            "Request body must contain at least one submission.".to_string(),
        )),
        Value::Array(items) => items.iter().map(parse_submission).collect(),
        Value::Object(_) => Ok(vec![parse_submission(body)?]),
        _ => Err(AppError::InvalidSubmission(
            "Request body must be a JSON object or an array of objects.".to_string(),
        )),
    }
}

/// Validates and deserializes a single submission object
pub fn parse_submission(value: &Value) -> Result<Submission, AppError> {
    let object = value.as_object().ok_or_else(|| {
        AppError::InvalidSubmission("Each submission must be a JSON object.".to_string())
    })?;

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| match object.get(**field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        })
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::MissingFields(missing));
    }

    if !object["phoneNumber"].is_string() || !object["name"].is_string() {
        return Err(AppError::InvalidSubmission(
            "phoneNumber and name must be strings.".to_string(),
        ));
    }
    if !object["campaign"].is_boolean() {
        return Err(AppError::InvalidSubmission(
            "campaign must be a boolean.".to_string(),
        ));
    }

    let submission: Submission = serde_json::from_value(value.clone())
        .map_err(|e| AppError::InvalidSubmission(format!("Invalid submission: {}", e)))?;
    submission.validate()?;

    Ok(submission)
}
