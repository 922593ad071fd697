//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::routing::HostResolveError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Site binding
    #[error("No site matches this host")]
    NoMatchingSite,
    #[error("Invalid request: {0}")]
    BadRequest(String),

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    // Internal errors
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Site binding
            ApiError::NoMatchingSite => (StatusCode::NOT_FOUND, "NO_MATCHING_SITE", self.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),

            // Resources
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),

            // Internal
            ApiError::Configuration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR", "Server misconfigured".to_string()),
            ApiError::ServiceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", self.to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<HostResolveError> for ApiError {
    fn from(err: HostResolveError) -> Self {
        match err {
            HostResolveError::StoreUnavailable(msg) => {
                tracing::error!(error = %msg, "Site store unavailable during host resolution");
                ApiError::ServiceUnavailable
            }
            HostResolveError::Configuration(msg) => {
                tracing::error!(error = %msg, "Site resolution misconfigured");
                ApiError::Configuration(msg)
            }
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::NoMatchingSite.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::BadRequest("malformed host".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(HostResolveError::StoreUnavailable("down".into()))
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(HostResolveError::Configuration("no default".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
