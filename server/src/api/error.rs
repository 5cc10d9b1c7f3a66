//! API Error Types
//!
//! Callers see a specific message for bad input and a generic one for store
//! failures. Store error details only go to the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::GatewayError;
use crate::moderation::ModerationError;
use crate::permissions::PermissionError;
use crate::ranks::RankError;

/// Message returned when the store stays unreachable after retries.
pub const UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable, try again";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<RankError> for ApiError {
    fn from(err: RankError) -> Self {
        match err {
            RankError::Gateway(e) => Self::Gateway(e),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::Gateway(e) => Self::Gateway(e),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<ModerationError> for ApiError {
    fn from(err: ModerationError) -> Self {
        match err {
            ModerationError::Gateway(e) => Self::Gateway(e),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Gateway(e) if e.is_transport() => {
                tracing::warn!(op = e.op(), error = %e, "Store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE_MESSAGE.to_string())
            }
            Self::Gateway(e) => {
                tracing::error!(op = e.op(), error = %e, "Store rejected request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_validation_is_bad_request() {
        let response = ApiError::from(RankError::OutOfRange(9)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unknown_action_is_bad_request() {
        let response =
            ApiError::from(PermissionError::UnknownAction("kick".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_fatal_store_error_is_internal() {
        let err = GatewayError::Rejected {
            op: "test",
            source: sqlx::Error::RowNotFound,
        };
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_transport_error_is_unavailable() {
        let err = GatewayError::Transport {
            op: "test",
            attempts: 3,
            source: sqlx::Error::PoolTimedOut,
        };
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
