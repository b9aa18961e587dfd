//! Error types for appraisal-web

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::report::ReportError;
use crate::services::anthropic_client::ModelError;

/// API error type
///
/// Every message is user-facing (Czech) and is sent verbatim to the browser.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid session (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Request body over the configured limit (413)
    #[error("Požadavek je příliš velký.")]
    PayloadTooLarge,

    /// Caller exceeded the request ceiling (429)
    #[error("Překročen limit požadavků. Zkuste to za chvíli.")]
    TooManyRequests,

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),

    /// Upstream model call failed
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Report rendering failed
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) | ApiError::Model(_) | ApiError::Report(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::BadRequest(format!("Neplatný požadavek: {}", rejection.body_text()))
    }
}

impl From<appraisal_common::Error> for ApiError {
    fn from(err: appraisal_common::Error) -> Self {
        match err {
            appraisal_common::Error::InvalidInput(msg) => {
                ApiError::BadRequest(format!("Neplatná data formuláře: {}", msg))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
