//! Bulk and compact exports
//!
//! GET /api/survey/export, GET /api/survey/ndjson, GET /api/surveys/compact

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::{self, StoredSurvey};
use crate::error::{ApiError, ApiResult};
use crate::limits::{COMPACT_LIMIT, EXPORT_CAP, NDJSON_LIMIT};
use crate::projection::{self, Projection, Shape, NDJSON_CONTENT_TYPE};
use crate::AppState;

use super::surveys::LimitParams;

#[derive(Debug, Default, Deserialize)]
pub struct CompactParams {
    pub limit: Option<String>,
    pub format: Option<String>,
}

/// `{ok, count, data}`
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub ok: bool,
    pub count: usize,
    pub data: Vec<Projection>,
}

impl ExportResponse {
    fn new(data: Vec<Projection>) -> Self {
        Self {
            ok: true,
            count: data.len(),
            data,
        }
    }
}

/// GET /api/survey/export
pub async fn export_surveys(State(state): State<AppState>) -> ApiResult<Json<ExportResponse>> {
    let records = db::list_recent_surveys(&state.db, EXPORT_CAP)
        .await
        .map_err(ApiError::Export)?;
    let data = projection::project_all(&records, Shape::Export)?;
    Ok(Json(ExportResponse::new(data)))
}

/// GET /api/survey/ndjson?limit=N
pub async fn ndjson_export(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Response> {
    let limit = NDJSON_LIMIT.resolve(params.limit.as_deref());
    let records = db::list_recent_surveys(&state.db, limit).await?;
    ndjson_response(&records)
}

/// GET /api/surveys/compact?limit=N[&format=ndjson]
pub async fn compact_export(
    State(state): State<AppState>,
    Query(params): Query<CompactParams>,
) -> ApiResult<Response> {
    let limit = COMPACT_LIMIT.resolve(params.limit.as_deref());
    let records = db::list_recent_surveys(&state.db, limit).await?;

    if params.format.as_deref() == Some("ndjson") {
        return ndjson_response(&records);
    }

    let data = projection::project_all(&records, Shape::Compact)?;
    Ok(Json(ExportResponse::new(data)).into_response())
}

fn ndjson_response(records: &[StoredSurvey]) -> ApiResult<Response> {
    let body = projection::encode_ndjson(records)?;
    Ok(([(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)], body).into_response())
}
