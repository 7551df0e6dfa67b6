//! GET /api/recommendations
//!
//! Regenerates the export artifact and relays the external recommender's
//! JSON verbatim.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiResult;
use crate::limits::resolve_top;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendParams {
    pub top: Option<String>,
}

pub async fn get_recommendations(
    State(state): State<AppState>,
    Query(params): Query<RecommendParams>,
) -> ApiResult<Json<Value>> {
    let top = resolve_top(params.top.as_deref(), state.recommender.default_top());
    let result = state.recommender.recommend(&state.db, top).await?;
    Ok(Json(result))
}
