use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{RankedCandidate, ScoreBreakdown},
    routes::{resolve_limit, AppState},
};

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    topic_id: Option<i64>,
    user_id: Option<i64>,
    limit: Option<i64>,
}

/// Handler for a single (user, video) score breakdown
pub async fn breakdown(
    State(state): State<Arc<AppState>>,
    Path((user_id, video_id)): Path<(i64, i64)>,
) -> AppResult<Json<ScoreBreakdown>> {
    let breakdown = state.engine.score_breakdown(user_id, video_id).await?;
    Ok(Json(breakdown))
}

/// Handler for the sentiment/topic/popularity ranked feed
pub async fn ranking(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RankingQuery>,
) -> AppResult<Json<Vec<RankedCandidate>>> {
    let limit = resolve_limit(params.limit)?;

    tracing::info!(
        topic_id = ?params.topic_id,
        user_id = ?params.user_id,
        limit,
        "Processing ranking request"
    );

    let ranked = state
        .engine
        .ranked_feed(params.topic_id, params.user_id, limit)
        .await?;
    Ok(Json(ranked))
}
