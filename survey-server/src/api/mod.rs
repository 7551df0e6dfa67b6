//! HTTP API handlers

pub mod export;
pub mod health;
pub mod recommendations;
pub mod surveys;

pub use export::{compact_export, export_surveys, ndjson_export};
pub use health::health_routes;
pub use recommendations::get_recommendations;
pub use surveys::{create_survey, get_survey, list_surveys};

use crate::error::ApiError;

/// Fallback for unknown `/api/*` paths
pub async fn api_not_found() -> ApiError {
    ApiError::NotFound
}
