//! HTTP error mapping
//!
//! Every failure renders as `{ "error": "<message>" }`. Upstream and
//! persistence causes are logged here and never echoed to the client.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::domain::ValidationErrors;
use crate::generation::GenerationError;
use crate::share::ShareError;
use crate::state::StateError;

pub const MSG_UNAUTHORIZED: &str = "Unauthorized";
pub const MSG_NOT_FOUND: &str = "Not found";
pub const MSG_INVALID_BODY: &str = "Invalid request body";
pub const MSG_GENERATION_FAILED: &str = "Failed to generate itinerary. Please try again.";
pub const MSG_SAVE_FAILED: &str = "Failed to save itinerary.";
pub const MSG_INTERNAL: &str = "Something went wrong, please try again";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error("upstream generation failed: {0}")]
    Upstream(String),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_body() -> Self {
        ApiError::BadRequest(MSG_INVALID_BODY.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, msg) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, MSG_UNAUTHORIZED.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, MSG_NOT_FOUND.to_string()),
            ApiError::Upstream(cause) => {
                error!(%cause, "Generation provider failure");
                (StatusCode::BAD_GATEWAY, MSG_GENERATION_FAILED.to_string())
            }
            ApiError::Persistence(cause) => {
                error!(%cause, "Itinerary persistence failure");
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_SAVE_FAILED.to_string())
            }
            ApiError::Internal(cause) => {
                error!(%cause, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL.to_string())
            }
        };
        let body = Json(serde_json::json!({ "error": msg }));
        (code, body).into_response()
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Unauthenticated => ApiError::Unauthorized,
            GenerationError::NotFound => ApiError::NotFound,
            GenerationError::GenerationFailed(cause) => ApiError::Upstream(cause),
            GenerationError::PersistFailed(cause) => ApiError::Persistence(cause),
            GenerationError::Internal(cause) => ApiError::Internal(cause),
        }
    }
}

impl From<StateError> for ApiError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::NotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ShareError> for ApiError {
    fn from(e: ShareError) -> Self {
        match e {
            ShareError::NotFound => ApiError::NotFound,
            ShareError::Lookup(inner) => ApiError::Internal(inner.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        ApiError::BadRequest(e.first_message().to_string())
    }
}
