use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failure reported by the data store or the identity provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend unreachable: {0}")]
    TransientNetwork(String),

    #[error("unexpected backend failure: {0}")]
    Unknown(String),
}

impl BackendError {
    /// Classifies a non-success HTTP status returned by the hosted backend.
    pub fn from_status(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status.as_u16() {
            400 | 409 | 422 => BackendError::Validation(message),
            401 | 403 => BackendError::PermissionDenied(message),
            404 | 406 => BackendError::NotFound(message),
            408 | 429 | 500..=599 => BackendError::TransientNetwork(message),
            _ => BackendError::Unknown(format!("HTTP {}: {}", status.as_u16(), message)),
        }
    }

    /// Builds the error from a failed response, preferring the backend's own
    /// message over the raw body.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        BackendError::from_status(status, extract_message(&body))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Validation(_) => "validation",
            BackendError::PermissionDenied(_) => "permission_denied",
            BackendError::NotFound(_) => "not_found",
            BackendError::TransientNetwork(_) => "transient_network",
            BackendError::Unknown(_) => "unknown",
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            BackendError::TransientNetwork(err.to_string())
        } else if let Some(status) = err.status() {
            BackendError::from_status(status, err.to_string())
        } else {
            BackendError::Unknown(err.to_string())
        }
    }
}

fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| json.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                "empty response body".to_string()
            } else {
                body.to_string()
            }
        })
}

/// Error returned by HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Validation(message) => ApiError::BadRequest(message),
            BackendError::PermissionDenied(message) => ApiError::Forbidden(message),
            BackendError::NotFound(message) => ApiError::NotFound(message),
            BackendError::TransientNetwork(message) => ApiError::ServiceUnavailable(message),
            BackendError::Unknown(message) => ApiError::Internal(message),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(format!("Validation error: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::ServiceUnavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        let json_response = serde_json::json!({
            "message": message,
            "status": status.as_u16()
        });
        (status, Json(json_response)).into_response()
    }
}
