use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{RankedCandidate, RankedItem, ScoreBreakdown, UserPreferences, Video},
    services::{
        embeddings::EmbeddingGateway,
        features,
        persona::PersonaManager,
        ranking::{self, RankingEngine},
        recommendations::{
            popularity_boost, sort_descending, ContentRecommender, POPULARITY_WEIGHT,
            SIMILARITY_WEIGHT,
        },
        similarity::{clamped_cosine, cosine_sparse},
        store::Store,
    },
};

const BREAKDOWN_SIMILARITY_WEIGHT: f64 = 0.7;
const BREAKDOWN_TOPIC_WEIGHT: f64 = 0.3;
const SENTIMENT_ADJUST_BASE: f64 = 0.8;
const SENTIMENT_ADJUST_SPAN: f64 = 0.4;

/// Tunables for [`RecommendationEngine`]
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub persona_ttl: chrono::Duration,
    pub persona_history_limit: usize,
    /// Seconds a composed score breakdown stays cached
    pub score_cache_ttl: u64,
    pub min_duration_secs: i32,
    pub candidate_pool_size: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            persona_ttl: chrono::Duration::hours(24),
            persona_history_limit: 50,
            score_cache_ttl: crate::db::PERSONALIZED_SCORE_TTL,
            min_duration_secs: 60,
            candidate_pool_size: 500,
        }
    }
}

/// Composes the single-pair score breakdown.
///
/// The sentiment score maps onto a multiplier in [0.8, 1.2] that scales the
/// blend of similarity and topic affinity; the final score is clamped to
/// [0, 1].
pub fn compose_breakdown(similarity: f64, topic_score: f64, sentiment_score: f64) -> ScoreBreakdown {
    let similarity = similarity.clamp(0.0, 1.0);
    let topic_score = topic_score.clamp(0.0, 1.0);
    let sentiment_adjust =
        SENTIMENT_ADJUST_BASE + SENTIMENT_ADJUST_SPAN * sentiment_score.clamp(0.0, 1.0);
    let blended = BREAKDOWN_SIMILARITY_WEIGHT * similarity + BREAKDOWN_TOPIC_WEIGHT * topic_score;

    ScoreBreakdown {
        similarity,
        topic_score,
        sentiment_adjust,
        final_score: (blended * sentiment_adjust).clamp(0.0, 1.0),
    }
}

/// Entry point for all personalized scoring and recommendation requests
///
/// Constructed once at start-up and shared behind an `Arc`.
pub struct RecommendationEngine {
    store: Arc<dyn Store>,
    gateway: Arc<dyn EmbeddingGateway>,
    cache: Cache,
    personas: PersonaManager,
    recommender: ContentRecommender,
    ranking: RankingEngine,
    settings: EngineSettings,
    /// Bumped on every preference write; a read-through that saw an older
    /// value must not populate the cache
    preference_epoch: Mutex<u64>,
}

impl RecommendationEngine {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn EmbeddingGateway>,
        cache: Cache,
        settings: EngineSettings,
    ) -> Self {
        let personas = PersonaManager::new(
            store.clone(),
            gateway.clone(),
            settings.persona_ttl,
            settings.persona_history_limit,
        );

        Self {
            store,
            gateway,
            cache,
            personas,
            recommender: ContentRecommender::new(settings.min_duration_secs),
            ranking: RankingEngine::new(),
            settings,
            preference_epoch: Mutex::new(0),
        }
    }

    /// The user's explicit preferences; empty when none were stored
    ///
    /// Read through the cache like [`Cache::get_or_compute`], except that a
    /// value loaded while a preference write was in flight is returned but
    /// not cached.
    pub async fn preferences(&self, user_id: i64) -> AppResult<UserPreferences> {
        let key = CacheKey::UserPreferences(user_id);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let epoch = *self.preference_epoch.lock().await;
        let preferences = self.load_preferences(user_id).await?;

        let current = self.preference_epoch.lock().await;
        if *current == epoch {
            self.cache.set_in_background(&key, &preferences, None);
        } else {
            tracing::debug!(user_id, "Preferences changed during read, not caching");
        }

        Ok(preferences)
    }

    async fn load_preferences(&self, user_id: i64) -> AppResult<UserPreferences> {
        Ok(self
            .store
            .user_preferences(user_id)
            .await?
            .unwrap_or_default())
    }

    /// Stores new preferences and drops the cached copy
    pub async fn update_preferences(
        &self,
        user_id: i64,
        preferences: UserPreferences,
    ) -> AppResult<UserPreferences> {
        let mut normalized = UserPreferences::new();
        preferences.tags.iter().for_each(|t| normalized.add_tag(t));
        preferences.keywords.iter().for_each(|k| normalized.add_keyword(k));
        preferences.regions.iter().for_each(|r| normalized.add_region(r));

        // Reads that load before this bump may still queue their value, but
        // it lands ahead of ours in the writer queue.
        *self.preference_epoch.lock().await += 1;
        self.store.save_user_preferences(user_id, &normalized).await?;

        let key = CacheKey::UserPreferences(user_id);
        self.cache.invalidate(&key).await;
        self.cache.set_in_background(&key, &normalized, None);

        tracing::info!(
            user_id,
            tags = normalized.tags.len(),
            keywords = normalized.keywords.len(),
            regions = normalized.regions.len(),
            "User preferences updated"
        );

        Ok(normalized)
    }

    /// A video's static metadata, read through the cache
    pub async fn video(&self, video_id: i64) -> AppResult<Video> {
        cached!(self.cache, CacheKey::VideoFeatures(video_id), None, async move {
            self.load_video(video_id).await
        })
    }

    async fn load_video(&self, video_id: i64) -> AppResult<Video> {
        self.store
            .video(video_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("video {}", video_id)))
    }

    /// Content-based recommendations from explicit preferences.
    ///
    /// Users without any preference signal get the most popular unwatched
    /// videos instead.
    pub async fn recommend_for_user(&self, user_id: i64, limit: usize) -> AppResult<Vec<RankedItem>> {
        let preferences = self.preferences(user_id).await?;
        let (candidates, viewed) = self.candidates_for(user_id).await?;

        let user_vector = features::user_vector(&preferences);
        if user_vector.is_empty() {
            tracing::info!(user_id, "No preference signal, falling back to popularity");
            return Ok(self.recommender.popular(&candidates, &viewed, limit));
        }

        let recommendations = self
            .recommender
            .recommend(&candidates, &user_vector, &viewed, limit);

        tracing::info!(
            user_id,
            candidates = candidates.len(),
            returned = recommendations.len(),
            "Content recommendations computed"
        );

        Ok(recommendations)
    }

    /// Recommendations from the user's persona vector against item embeddings.
    ///
    /// Falls back to [`Self::recommend_for_user`] when the user has no persona.
    pub async fn persona_recommendations(
        &self,
        user_id: i64,
        limit: usize,
    ) -> AppResult<Vec<RankedItem>> {
        let Some(persona) = self.personas.get_or_create_persona_vector(user_id).await else {
            tracing::info!(user_id, "Cold start, using content recommendations");
            return self.recommend_for_user(user_id, limit).await;
        };

        let (candidates, viewed) = self.candidates_for(user_id).await?;
        let mut eligible: Vec<Video> = candidates
            .into_iter()
            .filter(|video| !viewed.contains(&video.id) && self.recommender.is_eligible(video))
            .collect();
        self.ensure_embeddings(&mut eligible).await;

        let mut scored: Vec<RankedItem> = eligible
            .iter()
            .map(|video| {
                let similarity = video
                    .embedding
                    .as_deref()
                    .map(|embedding| clamped_cosine(&persona.vector, embedding))
                    .unwrap_or(0.0);
                RankedItem {
                    video_id: video.id,
                    score: SIMILARITY_WEIGHT * similarity
                        + POPULARITY_WEIGHT * popularity_boost(video.view_count),
                }
            })
            .collect();

        sort_descending(&mut scored);
        scored.truncate(limit);
        Ok(scored)
    }

    /// Videos similar to `video_id` by content features
    pub async fn similar_videos(&self, video_id: i64, limit: usize) -> AppResult<Vec<RankedItem>> {
        let base = self.video(video_id).await?;
        let candidates = self
            .store
            .candidate_videos(self.settings.candidate_pool_size)
            .await?;

        Ok(self.recommender.similar_items(&base, &candidates, limit))
    }

    /// Score breakdown for one (user, video) pair, cached for the score TTL
    pub async fn score_breakdown(&self, user_id: i64, video_id: i64) -> AppResult<ScoreBreakdown> {
        cached!(
            self.cache,
            CacheKey::PersonalizedScore { user_id, video_id },
            Some(self.settings.score_cache_ttl),
            async move { self.compute_score_breakdown(user_id, video_id).await }
        )
    }

    async fn compute_score_breakdown(&self, user_id: i64, video_id: i64) -> AppResult<ScoreBreakdown> {
        let mut video = self.video(video_id).await?;

        let similarity = match self.personas.get_or_create_persona_vector(user_id).await {
            Some(persona) => {
                self.ensure_embeddings(std::slice::from_mut(&mut video)).await;
                video
                    .embedding
                    .as_deref()
                    .map(|embedding| clamped_cosine(&persona.vector, embedding))
                    .unwrap_or(0.0)
            }
            None => {
                let preferences = self.preferences(user_id).await?;
                cosine_sparse(
                    &features::user_vector(&preferences),
                    &features::extract(&video),
                )
            }
        };

        let signals = self.store.video_signals(video_id).await?.unwrap_or_default();
        let topic = ranking::topic_score(signals.topic_score, signals.topic_id, None);
        let sentiment = ranking::sentiment_score(signals.pos_ratio, signals.avg_sentiment_score);

        let breakdown = compose_breakdown(similarity, topic, sentiment);
        tracing::debug!(user_id, video_id, final_score = breakdown.final_score, "Score breakdown computed");
        Ok(breakdown)
    }

    /// Batch ranking of pre-aggregated candidates.
    ///
    /// With a `user_id` whose persona is available, the clamped persona/item
    /// cosine is supplied as user affinity.
    pub async fn ranked_feed(
        &self,
        target_topic_id: Option<i64>,
        user_id: Option<i64>,
        limit: usize,
    ) -> AppResult<Vec<RankedCandidate>> {
        let mut candidates = self
            .store
            .ranking_candidates(self.settings.candidate_pool_size)
            .await?;

        if let Some(user_id) = user_id {
            if let Some(persona) = self.personas.get_or_create_persona_vector(user_id).await {
                let ids: Vec<i64> = candidates.iter().map(|c| c.video_id).collect();
                let mut videos = self.store.videos_by_ids(&ids).await?;
                self.ensure_embeddings(&mut videos).await;

                let affinities: HashMap<i64, f64> = videos
                    .iter()
                    .filter_map(|video| {
                        let embedding = video.embedding.as_deref()?;
                        Some((video.id, clamped_cosine(&persona.vector, embedding)))
                    })
                    .collect();
                for candidate in &mut candidates {
                    candidate.user_affinity = affinities.get(&candidate.video_id).copied();
                }
            }
        }

        let mut ranked = self.ranking.rank(&candidates, target_topic_id);
        ranked.truncate(limit);
        Ok(ranked)
    }

    async fn candidates_for(&self, user_id: i64) -> AppResult<(Vec<Video>, HashSet<i64>)> {
        let candidates = self
            .store
            .candidate_videos(self.settings.candidate_pool_size)
            .await?;
        let viewed: HashSet<i64> = self
            .store
            .viewed_video_ids(user_id)
            .await?
            .into_iter()
            .collect();
        Ok((candidates, viewed))
    }

    /// Fills missing item embeddings with one gateway call and writes them
    /// back to the store and the item cache. Failures leave the embedding
    /// empty.
    async fn ensure_embeddings(&self, videos: &mut [Video]) {
        let missing: Vec<usize> = videos
            .iter()
            .enumerate()
            .filter(|(_, video)| video.embedding.is_none())
            .map(|(idx, _)| idx)
            .collect();
        if missing.is_empty() {
            return;
        }

        let texts: Vec<String> = missing
            .iter()
            .map(|idx| videos[*idx].embedding_text())
            .collect();
        let embeddings = match self.gateway.embed_batch(&texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                tracing::warn!(error = %e, missing = missing.len(), "Item embedding failed, scoring without");
                return;
            }
        };

        for (idx, embedding) in missing.into_iter().zip(embeddings) {
            let Some(embedding) = embedding else { continue };
            let video = &mut videos[idx];
            if let Err(e) = self.store.save_video_embedding(video.id, &embedding).await {
                tracing::warn!(video_id = video.id, error = %e, "Failed to store item embedding");
            }
            video.embedding = Some(embedding);
            self.cache
                .set_in_background(&CacheKey::VideoFeatures(video.id), &*video, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_breakdown_neutral_sentiment_bounds() {
        let low = compose_breakdown(0.0, 0.0, 0.0);
        assert_eq!(low.sentiment_adjust, 0.8);
        assert_eq!(low.final_score, 0.0);

        let high = compose_breakdown(1.0, 1.0, 1.0);
        assert!((high.sentiment_adjust - 1.2).abs() < 1e-12);
        assert_eq!(high.final_score, 1.0);
    }

    #[test]
    fn test_compose_breakdown_blends_components() {
        let breakdown = compose_breakdown(0.5, 0.5, 0.5);
        assert!((breakdown.sentiment_adjust - 1.0).abs() < 1e-12);
        assert!((breakdown.final_score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_compose_breakdown_clamps_raw_inputs() {
        let breakdown = compose_breakdown(-0.4, 3.0, 7.0);
        assert_eq!(breakdown.similarity, 0.0);
        assert_eq!(breakdown.topic_score, 1.0);
        assert!((breakdown.sentiment_adjust - 1.2).abs() < 1e-12);
        assert!((breakdown.final_score - 0.36).abs() < 1e-12);
    }

    #[test]
    fn test_default_settings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.persona_ttl, chrono::Duration::hours(24));
        assert_eq!(settings.persona_history_limit, 50);
        assert_eq!(settings.score_cache_ttl, 3600);
    }
}
