use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use splits::SplitsError;

/// HTTP-facing wrapper around the core error taxonomy.
#[derive(Debug)]
pub struct ApiError(pub SplitsError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<SplitsError> for ApiError {
    fn from(e: SplitsError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError(SplitsError::InvalidInput(msg.into()))
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        match &self.0 {
            SplitsError::InvalidInput(msg) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "invalid_input",
                    "message": msg
                }))
            }
            SplitsError::NotFound(msg) => HttpResponse::NotFound().json(serde_json::json!({
                "error": "not_found",
                "message": msg
            })),
            SplitsError::Conflict(msg) => HttpResponse::Conflict().json(serde_json::json!({
                "error": "conflict",
                "message": msg
            })),
            SplitsError::ChainFailed(msg) => {
                tracing::error!("chain operation failed: {msg}");
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "chain_failed",
                    "message": msg
                }))
            }
            SplitsError::Misconfigured(msg) => {
                tracing::error!("misconfigured: {msg}");
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "misconfigured",
                    "message": msg
                }))
            }
            SplitsError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "internal_error",
                    "message": "An internal error occurred"
                }))
            }
        }
    }
}
