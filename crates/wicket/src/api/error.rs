//! Unified API error handling with structured responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::player::PlayerError;

/// API error type with structured responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Gateway error: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self::BadGateway(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::BadGateway(_) => "BAD_GATEWAY",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Categorize an anyhow error into the appropriate ApiError variant.
    ///
    /// Player failures anywhere in the chain become gateway errors; beyond
    /// that the message decides:
    /// - "not found" -> NotFound
    /// - "invalid" / "must be" -> BadRequest
    /// - Default -> Internal
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        if err.chain().any(|cause| cause.is::<PlayerError>()) {
            return ApiError::BadGateway(format!("{:#}", err));
        }

        let msg = err.to_string();
        let msg_lower = msg.to_lowercase();

        if msg_lower.contains("not found") {
            ApiError::NotFound(msg)
        } else if msg_lower.contains("invalid") || msg_lower.contains("must be") {
            ApiError::BadRequest(msg)
        } else {
            ApiError::Internal(msg)
        }
    }
}

/// Structured error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        match &self {
            ApiError::Internal(msg) => {
                error!(error_code = code, message = %msg, "API error");
            }
            ApiError::BadGateway(msg) => {
                warn!(error_code = code, message = %msg, "Upstream error");
            }
            _ => {
                tracing::debug!(error_code = code, message = %message, "Client error");
            }
        }

        let body = ErrorResponse {
            error: message,
            code,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

/// Convert anyhow errors to API errors using the centralized categorization logic.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::from_anyhow(err)
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization_not_found() {
        let err = anyhow::anyhow!("registration 42 not found");
        let api_err = ApiError::from_anyhow(err);
        assert!(matches!(api_err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_error_categorization_bad_request() {
        let err = anyhow::anyhow!("invalid launch URL");
        let api_err = ApiError::from_anyhow(err);
        assert!(matches!(api_err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_error_categorization_internal_default() {
        let err = anyhow::anyhow!("something went wrong");
        let api_err = ApiError::from_anyhow(err);
        assert!(matches!(api_err, ApiError::Internal(_)));
    }

    #[test]
    fn test_player_errors_map_to_bad_gateway() {
        let err = anyhow::Error::from(PlayerError::UpstreamStatus {
            status: 500,
            message: "boom".to_string(),
        });
        let api_err = ApiError::from_anyhow(err);
        assert!(matches!(api_err, ApiError::BadGateway(_)));
    }

    #[test]
    fn test_wrapped_player_errors_map_to_bad_gateway() {
        let err = anyhow::Error::from(PlayerError::UpstreamStatus {
            status: 401,
            message: "bad credentials".to_string(),
        })
        .context("requesting auth token");
        let api_err = ApiError::from_anyhow(err);
        assert!(matches!(api_err, ApiError::BadGateway(_)));
    }

    #[test]
    fn test_error_response_status_codes() {
        assert_eq!(ApiError::not_found("").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::bad_request("").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::bad_gateway("").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::internal("").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
