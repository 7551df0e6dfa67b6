//! Survey submission and retrieval
//!
//! POST /api/surveys, GET /api/surveys, GET /api/surveys/:id

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::limits::LIST_LIMIT;
use crate::projection::{self, Projection, Shape};
use crate::schema::{self, ValidationErrors};
use crate::AppState;

/// Raw `limit` query; parsed leniently by [`crate::limits::LimitPolicy`]
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub data: Vec<Projection>,
}

/// POST /api/surveys
///
/// The body is read as bytes so a malformed document is reported as a
/// validation failure rather than an extractor rejection.
pub async fn create_survey(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let input: Value = serde_json::from_slice(&body)
        .map_err(|e| ValidationErrors::form(format!("Malformed JSON body: {}", e)))?;

    let answers = schema::validate(&input).map_err(|errors| {
        debug!(fields = ?errors.fields(), "Rejected survey submission");
        errors
    })?;

    let id = db::insert_survey(&state.db, &answers).await?;
    info!(id, q1 = answers.q1.as_str(), "Stored survey response");

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /api/surveys?limit=N
pub async fn list_surveys(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<ListResponse>> {
    let limit = LIST_LIMIT.resolve(params.limit.as_deref());
    let records = db::list_recent_surveys(&state.db, limit).await?;
    let data = projection::project_all(&records, Shape::Full)?;
    Ok(Json(ListResponse { data }))
}

/// GET /api/surveys/:id
///
/// Ids that do not parse as integers cannot exist and are 404.
pub async fn get_survey(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<Projection>> {
    let id: i64 = raw_id.trim().parse().map_err(|_| ApiError::NotFound)?;
    let record = db::get_survey(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(projection::project(&record, Shape::Full)?))
}
