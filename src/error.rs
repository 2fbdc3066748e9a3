//! API error surface
//!
//! Every failure maps to HTTP 500 with the same JSON envelope. Clients can
//! only tell failures apart through the free-text `details` field.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::upstream::UpstreamError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The source could not be reached or answered with a non-2xx status
    #[error("Upstream transport failed: {0}")]
    Transport(UpstreamError),

    /// The source answered with something unusable
    #[error("Upstream payload invalid: {0}")]
    InvalidPayload(UpstreamError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn message(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "invalid upstream data",
            ApiError::Transport(_) | ApiError::Internal(_) => {
                "failed to fetch or process upstream data"
            }
        }
    }

    fn details(&self) -> String {
        match self {
            ApiError::Transport(e) | ApiError::InvalidPayload(e) => e.to_string(),
            ApiError::Internal(msg) => msg.clone(),
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(e: UpstreamError) -> Self {
        if e.is_payload_error() {
            ApiError::InvalidPayload(e)
        } else {
            ApiError::Transport(e)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let details = self.details();
        let body = ErrorBody {
            error: self.message(),
            details: (!details.is_empty()).then_some(details),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
