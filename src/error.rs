// HTTP API Error Types
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::engine::EngineError;

/// Markers that classify an otherwise untyped engine error as not-found
const NOT_FOUND_MARKERS: &[&str] = &["not found"];
const INVALID_ID_MARKERS: &[&str] = &["invalid id", "cast to objectid failed"];

/// HTTP API error; every handler failure ends up here
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    // 400 with field-level details
    Validation {
        name: String,
        message: String,
        data: Value,
    },

    // 400 for requests the adapter itself cannot read
    BadRequest(String),

    // 401
    Unauthorized(String),

    // 404
    NotFound(String),

    // 500
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation { message, .. } => message,
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Internal(msg) => msg,
        }
    }

    /// Response body. Unauthorized uses the `errors.message[]` shape, the rest `{error, message}`.
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::Validation { name, message, data } => json!({
                "error": name,
                "message": message,
                "data": data,
            }),
            ApiError::Unauthorized(message) => json!({
                "errors": { "message": [message] }
            }),
            _ => json!({
                "error": self.status_code().canonical_reason().unwrap_or("Error"),
                "message": self.message(),
            }),
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    /// 404 for a missing record, naming both the collection and the id
    pub fn record_not_found(collection: &str, id: &str) -> Self {
        ApiError::NotFound(format!("{} with id '{}' not found", collection, id))
    }
}

fn is_not_found_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    NOT_FOUND_MARKERS
        .iter()
        .chain(INVALID_ID_MARKERS)
        .any(|marker| lowered.contains(marker))
}

/// Classify an engine error by shape. Order matters: field details, then an
/// explicit 401, then message markers, then everything else.
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();

        if let Some(fields) = err.field_errors() {
            return ApiError::Validation {
                name: err.name().to_string(),
                message,
                data: json!(fields),
            };
        }

        if err.status() == Some(401) {
            return ApiError::Unauthorized(message);
        }

        if is_not_found_message(&message) {
            return ApiError::NotFound(message);
        }

        ApiError::Internal(message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.message());
        } else {
            tracing::warn!("request rejected with {}: {}", status.as_u16(), self.message());
        }
        (status, Json(self.to_json())).into_response()
    }
}
