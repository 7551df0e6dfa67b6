//! Error types for survey-server
//!
//! Every handler failure maps to a status code and a uniform `{error: ...}`
//! body. Internal detail is logged, never sent to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::projection::ProjectionError;
use crate::recommender::RecommendError;
use crate::schema::ValidationErrors;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Submission failed validation (400)
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Record or route not found (404)
    #[error("Not found")]
    NotFound,

    /// Store read/write failure (500)
    #[error("Storage error: {0}")]
    Storage(#[from] survey_common::Error),

    /// Stored record could not be rendered (500)
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// Bulk export read failure (500, distinct client message)
    #[error("Export failed: {0}")]
    Export(survey_common::Error),

    /// External recommender failure (500)
    #[error("Recommendation failed: {0}")]
    Recommend(#[from] RecommendError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Validation failed",
                    "details": errors.details(),
                }),
            ),
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "Not found" })),
            ApiError::Storage(err) => {
                if err.is_lock_timeout() {
                    warn!("Database busy: {}", err);
                } else {
                    error!("Database error: {}", err);
                }
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Database error" }),
                )
            }
            ApiError::Projection(err) => {
                error!("Failed to render stored survey: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Database error" }),
                )
            }
            ApiError::Export(err) => {
                error!("Export read failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "DB read failed" }),
                )
            }
            ApiError::Recommend(err) => {
                error!(kind = err.kind(), "Recommender failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Gemini processing failed" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
