use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{error::AppResult, models::RankedItem, routes::{resolve_limit, AppState}};

/// Which signal drives a user's recommendations
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationMode {
    /// Explicit preference tags, keywords and regions
    #[default]
    Content,
    /// Embedding persona built from watch history
    Persona,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    limit: Option<i64>,
    #[serde(default)]
    mode: RecommendationMode,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<i64>,
}

/// Handler for per-user recommendations
pub async fn for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<Vec<RankedItem>>> {
    let limit = resolve_limit(params.limit)?;

    tracing::info!(user_id, limit, mode = ?params.mode, "Processing recommendation request");

    let items = match params.mode {
        RecommendationMode::Content => state.engine.recommend_for_user(user_id, limit).await?,
        RecommendationMode::Persona => {
            state.engine.persona_recommendations(user_id, limit).await?
        }
    };

    Ok(Json(items))
}

/// Handler for videos similar to a given video
pub async fn similar(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<i64>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<RankedItem>>> {
    let limit = resolve_limit(params.limit)?;
    let items = state.engine.similar_videos(video_id, limit).await?;
    Ok(Json(items))
}
