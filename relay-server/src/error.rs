//! Request-level failures and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Every way a relay request can fail.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Bad, missing or expired credential.
    #[error("{0}")]
    Unauthorized(String),

    /// Body was neither JSON nor form data.
    #[error("Invalid request data")]
    InvalidRequestData,

    /// Transport failure calling the downstream.
    #[error("Failed to forward to Zoho Flow")]
    ForwardFailed,

    /// Token could not be signed.
    #[error("Failed to issue token")]
    TokenIssue,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RelayError::InvalidRequestData => StatusCode::BAD_REQUEST,
            RelayError::ForwardFailed | RelayError::TokenIssue => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error body returned to callers.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorResponse {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            RelayError::Unauthorized("Invalid token".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(RelayError::InvalidRequestData.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::ForwardFailed.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_detail_text() {
        assert_eq!(
            RelayError::Unauthorized("Token has expired".into()).to_string(),
            "Token has expired"
        );
        assert_eq!(
            RelayError::ForwardFailed.to_string(),
            "Failed to forward to Zoho Flow"
        );
    }
}
