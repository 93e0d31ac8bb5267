use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{error::AppResult, models::UserPreferences, routes::AppState};

/// Handler replacing a user's explicit preferences
///
/// Responds with the stored, normalized preferences.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(preferences): Json<UserPreferences>,
) -> AppResult<Json<UserPreferences>> {
    let stored = state.engine.update_preferences(user_id, preferences).await?;
    Ok(Json(stored))
}
