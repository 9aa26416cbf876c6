//! Typed errors and HTTP mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {kind} identifier: '{name}'")]
    InvalidIdentifier { kind: &'static str, name: String },
    #[error("table {table} must have exactly one primary key, found {count}")]
    PrimaryKeyCount { table: String, count: usize },
    #[error("invalid primary key: table {table} column {column} (must be a non-null integer)")]
    InvalidPrimaryKey { table: String, column: String },
    #[error("duplicate field {field} in table {table}")]
    DuplicateField { table: String, field: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("invalid setting {key}: {message}")]
    InvalidSetting { key: &'static str, message: String },
    #[error("config load: {0}")]
    Load(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("row {table}/{id} no longer exists")]
    RowMissing { table: String, id: i64 },
    #[error("row decode: {0}")]
    Decode(String),
    #[error("storage backend: {0}")]
    Backend(String),
}

/// Where an invalid value came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Body,
    Query,
    Path,
}

/// One offending field in a 422 response.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldError {
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub code: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(location: Location, field: impl Into<String>, code: &'static str, message: impl Into<String>) -> Self {
        FieldError {
            location,
            field: Some(field.into()),
            code,
            message: message.into(),
        }
    }

    /// Error about the whole body rather than one field.
    pub fn body(code: &'static str, message: impl Into<String>) -> Self {
        FieldError {
            location: Location::Body,
            field: None,
            code,
            message: message.into(),
        }
    }
}

/// Shape validation failure; carries every offending field, not just the first.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.errors.len();
        write!(f, "{} validation error{}", n, if n == 1 { "" } else { "s" })
    }
}

impl std::error::Error for ValidationError {}

impl From<FieldError> for ValidationError {
    fn from(e: FieldError) -> Self {
        ValidationError { errors: vec![e] }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {resource}/{id}")]
    NotFound { resource: String, id: i64 },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("request body too large")]
    PayloadTooLarge,
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            // Deleted by a concurrent request between fetch and write.
            StorageError::RowMissing { table, id } => AppError::NotFound { resource: table, id },
            other => AppError::Storage(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge;
        }
        AppError::Validation(FieldError::body("invalid_json", rejection.body_text()).into())
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found", self.to_string(), None),
            AppError::Validation(v) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                self.to_string(),
                serde_json::to_value(&v.errors).ok(),
            ),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "too_large", self.to_string(), None),
            AppError::Config(e) => {
                tracing::error!(error = %e, "configuration error while serving request");
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", "internal server error".to_string(), None)
            }
            AppError::Storage(e) => {
                tracing::error!(error = %e, "storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "internal server error".to_string(), None)
            }
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_message_counts_fields() {
        let one: ValidationError = FieldError::new(Location::Body, "title", "missing", "field is required").into();
        assert_eq!(one.to_string(), "1 validation error");
        let two = ValidationError {
            errors: vec![one.errors[0].clone(), FieldError::body("invalid_json", "bad")],
        };
        assert_eq!(two.to_string(), "2 validation errors");
    }

    #[test]
    fn row_missing_maps_to_not_found() {
        let e: AppError = StorageError::RowMissing { table: "notes".into(), id: 3 }.into();
        assert!(matches!(e, AppError::NotFound { id: 3, .. }));
        let e: AppError = StorageError::Backend("down".into()).into();
        assert_eq!(e.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn field_error_serializes_location_lowercase() {
        let v = serde_json::to_value(FieldError::new(Location::Query, "limit", "out_of_range", "too big")).unwrap();
        assert_eq!(v["location"], "query");
        assert_eq!(v["field"], "limit");
        let v = serde_json::to_value(FieldError::body("invalid_json", "x")).unwrap();
        assert!(v.get("field").is_none());
    }
}
