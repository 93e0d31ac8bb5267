use axum::{
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{
    error::{AppError, AppResult},
    services::RecommendationEngine,
};

pub mod preferences;
pub mod recommendations;
pub mod scores;

/// Number of results returned when the caller gives no `limit`
pub const DEFAULT_LIMIT: i64 = 10;

/// Shared state handed to every handler
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
}

impl AppState {
    pub fn new(engine: Arc<RecommendationEngine>) -> Self {
        Self { engine }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/:user_id/recommendations",
            get(recommendations::for_user),
        )
        .route("/users/:user_id/preferences", put(preferences::update))
        .route(
            "/users/:user_id/videos/:video_id/score",
            get(scores::breakdown),
        )
        .route("/videos/:video_id/similar", get(recommendations::similar))
        .route("/ranking", get(scores::ranking))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Validates a caller-supplied result limit
///
/// A negative limit is a caller bug and is rejected rather than clamped.
pub(crate) fn resolve_limit(limit: Option<i64>) -> AppResult<usize> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    usize::try_from(limit)
        .map_err(|_| AppError::InvalidInput(format!("limit must be non-negative, got {}", limit)))
}
