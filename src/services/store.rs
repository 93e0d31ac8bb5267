/// Persistence collaborator
///
/// The engine reads interaction history, video metadata and pre-aggregated
/// signals through this trait and writes back derived vectors. The schema
/// behind it is owned elsewhere; `PgStore` is the Postgres implementation.
use crate::{
    error::AppResult,
    models::{InteractionEvent, PersonaVector, RankingCandidate, UserPreferences, Video, VideoSignals},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Most recent watch/like events for a user, at most `limit`
    ///
    /// Ordered liked-first, then by descending watch time, then newest first.
    async fn recent_interactions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> AppResult<Vec<InteractionEvent>>;

    async fn video(&self, video_id: i64) -> AppResult<Option<Video>>;

    /// Videos for the given ids; unknown ids are skipped
    async fn videos_by_ids(&self, video_ids: &[i64]) -> AppResult<Vec<Video>>;

    /// Recommendation candidate pool, at most `limit` videos
    async fn candidate_videos(&self, limit: usize) -> AppResult<Vec<Video>>;

    /// Ids of videos the user has already watched
    async fn viewed_video_ids(&self, user_id: i64) -> AppResult<Vec<i64>>;

    async fn save_video_embedding(&self, video_id: i64, embedding: &[f32]) -> AppResult<()>;

    async fn persona_vector(&self, user_id: i64) -> AppResult<Option<PersonaVector>>;

    /// Inserts or overwrites the user's persona vector
    async fn upsert_persona_vector(&self, persona: &PersonaVector) -> AppResult<()>;

    async fn user_preferences(&self, user_id: i64) -> AppResult<Option<UserPreferences>>;

    async fn save_user_preferences(
        &self,
        user_id: i64,
        preferences: &UserPreferences,
    ) -> AppResult<()>;

    /// Sentiment and topic signals aggregated for one video
    async fn video_signals(&self, video_id: i64) -> AppResult<Option<VideoSignals>>;

    /// Pre-aggregated batch ranking inputs, at most `limit`
    async fn ranking_candidates(&self, limit: usize) -> AppResult<Vec<RankingCandidate>>;
}
