use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use crate::{
    error::AppResult,
    models::{
        normalize_tags, InteractionEvent, InteractionKind, PersonaVector, RankingCandidate,
        UserPreferences, Video, VideoSignals,
    },
    services::store::Store,
};

const VIDEO_COLUMNS: &str = "id, title, description, tags, region, keyword, duration_secs, \
                             view_count, like_count, embedding";

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

#[derive(Debug, FromRow)]
struct VideoRow {
    id: i64,
    title: String,
    description: Option<String>,
    tags: Option<serde_json::Value>,
    region: Option<String>,
    keyword: Option<String>,
    duration_secs: Option<i32>,
    view_count: Option<i64>,
    like_count: Option<i64>,
    embedding: Option<Vec<f32>>,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        Video {
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            tags: row.tags.as_ref().map(normalize_tags).unwrap_or_default(),
            region: row.region,
            keyword: row.keyword,
            duration_secs: row.duration_secs,
            view_count: row.view_count.unwrap_or(0),
            like_count: row.like_count.unwrap_or(0),
            embedding: row.embedding.filter(|e| !e.is_empty()),
        }
    }
}

#[derive(Debug, FromRow)]
struct InteractionRow {
    user_id: i64,
    video_id: i64,
    event_type: String,
    watch_time: Option<f64>,
    liked: Option<bool>,
    created_at: DateTime<Utc>,
}

impl InteractionRow {
    fn into_event(self) -> Option<InteractionEvent> {
        let kind = InteractionKind::parse(&self.event_type)?;
        Some(InteractionEvent {
            user_id: self.user_id,
            video_id: self.video_id,
            kind,
            watch_time: self.watch_time,
            liked: self.liked.unwrap_or(false),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PreferencesRow {
    tags: Option<Vec<String>>,
    keywords: Option<Vec<String>>,
    regions: Option<Vec<String>>,
}

/// Postgres-backed persistence collaborator
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn recent_interactions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> AppResult<Vec<InteractionEvent>> {
        let rows: Vec<InteractionRow> = sqlx::query_as(
            r#"
            SELECT user_id, video_id, event_type, watch_time, liked, created_at
            FROM user_interactions
            WHERE user_id = $1 AND event_type IN ('watch', 'like')
            ORDER BY liked DESC NULLS LAST, watch_time DESC NULLS LAST, created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(InteractionRow::into_event).collect())
    }

    async fn video(&self, video_id: i64) -> AppResult<Option<Video>> {
        let row: Option<VideoRow> =
            sqlx::query_as(&format!("SELECT {} FROM videos WHERE id = $1", VIDEO_COLUMNS))
                .bind(video_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Video::from))
    }

    async fn videos_by_ids(&self, video_ids: &[i64]) -> AppResult<Vec<Video>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<VideoRow> = sqlx::query_as(&format!(
            "SELECT {} FROM videos WHERE id = ANY($1)",
            VIDEO_COLUMNS
        ))
        .bind(video_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Video::from).collect())
    }

    async fn candidate_videos(&self, limit: usize) -> AppResult<Vec<Video>> {
        let rows: Vec<VideoRow> = sqlx::query_as(&format!(
            "SELECT {} FROM videos ORDER BY id LIMIT $1",
            VIDEO_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Video::from).collect())
    }

    async fn viewed_video_ids(&self, user_id: i64) -> AppResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT video_id
            FROM user_interactions
            WHERE user_id = $1 AND event_type = 'watch'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn save_video_embedding(&self, video_id: i64, embedding: &[f32]) -> AppResult<()> {
        sqlx::query("UPDATE videos SET embedding = $2 WHERE id = $1")
            .bind(video_id)
            .bind(embedding)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn persona_vector(&self, user_id: i64) -> AppResult<Option<PersonaVector>> {
        let row: Option<(Vec<f32>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT vector, updated_at FROM user_personas WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(vector, updated_at)| PersonaVector {
            user_id,
            vector,
            updated_at,
        }))
    }

    async fn upsert_persona_vector(&self, persona: &PersonaVector) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_personas (user_id, vector, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET vector = EXCLUDED.vector, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(persona.user_id)
        .bind(&persona.vector)
        .bind(persona.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn user_preferences(&self, user_id: i64) -> AppResult<Option<UserPreferences>> {
        let row: Option<PreferencesRow> = sqlx::query_as(
            "SELECT tags, keywords, regions FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UserPreferences {
            tags: row.tags.unwrap_or_default(),
            keywords: row.keywords.unwrap_or_default(),
            regions: row.regions.unwrap_or_default(),
        }))
    }

    async fn save_user_preferences(
        &self,
        user_id: i64,
        preferences: &UserPreferences,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (user_id, tags, keywords, regions)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET tags = EXCLUDED.tags, keywords = EXCLUDED.keywords, regions = EXCLUDED.regions
            "#,
        )
        .bind(user_id)
        .bind(&preferences.tags)
        .bind(&preferences.keywords)
        .bind(&preferences.regions)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn video_signals(&self, video_id: i64) -> AppResult<Option<VideoSignals>> {
        let row: Option<(Option<f64>, Option<f64>, Option<i64>, Option<f64>)> = sqlx::query_as(
            r#"
            SELECT s.pos_ratio, s.avg_score, t.topic_id, t.topic_score
            FROM videos v
            LEFT JOIN video_sentiments s ON s.video_id = v.id
            LEFT JOIN video_topics t ON t.video_id = v.id
            WHERE v.id = $1
            "#,
        )
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(pos_ratio, avg_sentiment_score, topic_id, topic_score)| VideoSignals {
                video_id,
                pos_ratio,
                avg_sentiment_score,
                topic_id,
                topic_score,
            },
        ))
    }

    async fn ranking_candidates(&self, limit: usize) -> AppResult<Vec<RankingCandidate>> {
        let rows: Vec<(i64, Option<f64>, Option<f64>, Option<i64>, Option<f64>, Option<i64>)> =
            sqlx::query_as(
                r#"
                SELECT v.id, s.pos_ratio, s.avg_score, t.topic_id, t.topic_score, v.view_count
                FROM videos v
                LEFT JOIN video_sentiments s ON s.video_id = v.id
                LEFT JOIN video_topics t ON t.video_id = v.id
                ORDER BY v.id
                LIMIT $1
                "#,
            )
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(
                |(video_id, pos_ratio, avg_sentiment_score, topic_id, topic_score, view_count)| {
                    RankingCandidate {
                        video_id,
                        pos_ratio,
                        avg_sentiment_score,
                        topic_id,
                        topic_score,
                        view_count,
                        user_affinity: None,
                    }
                },
            )
            .collect())
    }
}
