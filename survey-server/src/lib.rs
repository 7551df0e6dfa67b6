//! survey-server library
//!
//! Survey collection service: validates submissions, stores them in SQLite,
//! serves full/compact/line-delimited projections and relays an external
//! recommender.

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod limits;
pub mod projection;
pub mod recommender;
pub mod schema;

use recommender::Recommender;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Page served at `/` from the static directory
pub const INDEX_FILE_NAME: &str = "survey.html";

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// External recommendation invoker
    pub recommender: Arc<Recommender>,
    /// Frontend directory served at `/`, if any
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, recommender: Recommender, static_dir: Option<PathBuf>) -> Self {
        Self {
            db,
            recommender: Arc::new(recommender),
            static_dir,
        }
    }
}

/// Build application router
///
/// Unknown paths under `/api` get the JSON 404 body; everything outside
/// `/api` and `/health` falls through to the static directory when one is
/// configured.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/surveys", get(api::list_surveys).post(api::create_survey))
        .route("/surveys/compact", get(api::compact_export))
        .route("/surveys/:id", get(api::get_survey))
        .route("/survey/export", get(api::export_surveys))
        .route("/survey/ndjson", get(api::ndjson_export))
        .route("/recommendations", get(api::get_recommendations))
        .fallback(api::api_not_found);

    let mut app = Router::new()
        .merge(api::health_routes())
        .nest("/api", api_routes);

    if let Some(dir) = &state.static_dir {
        app = app
            .route_service("/", ServeFile::new(dir.join(INDEX_FILE_NAME)))
            .fallback_service(ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
