use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{InteractionEvent, PersonaVector, Video},
    services::{embeddings::EmbeddingGateway, store::Store},
};

/// Orders events so the strongest signals survive truncation: liked first,
/// then longest watch, then most recent.
pub fn order_for_persona(mut events: Vec<InteractionEvent>, limit: usize) -> Vec<InteractionEvent> {
    events.sort_by(|a, b| {
        b.liked
            .cmp(&a.liked)
            .then_with(|| {
                let a_watch = a.watch_time.unwrap_or(f64::NEG_INFINITY);
                let b_watch = b.watch_time.unwrap_or(f64::NEG_INFINITY);
                b_watch.total_cmp(&a_watch)
            })
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    events.truncate(limit);
    events
}

/// Arithmetic mean per dimension.
///
/// The first vector fixes the dimension; vectors of any other length are
/// skipped. Returns `None` when there is nothing to pool.
pub fn mean_pool(embeddings: &[Vec<f32>]) -> Option<Vec<f32>> {
    let dimension = embeddings.iter().map(Vec::len).find(|len| *len > 0)?;

    let mut sum = vec![0.0_f64; dimension];
    let mut count = 0usize;
    for embedding in embeddings {
        if embedding.len() != dimension {
            tracing::warn!(
                expected = dimension,
                actual = embedding.len(),
                "Skipping embedding with mismatched dimension"
            );
            continue;
        }
        for (acc, value) in sum.iter_mut().zip(embedding) {
            *acc += f64::from(*value);
        }
        count += 1;
    }

    Some(sum.into_iter().map(|total| (total / count as f64) as f32).collect())
}

/// Derives and maintains one persona vector per user
pub struct PersonaManager {
    store: Arc<dyn Store>,
    gateway: Arc<dyn EmbeddingGateway>,
    ttl: chrono::Duration,
    history_limit: usize,
}

impl PersonaManager {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn EmbeddingGateway>,
        ttl: chrono::Duration,
        history_limit: usize,
    ) -> Self {
        Self {
            store,
            gateway,
            ttl,
            history_limit,
        }
    }

    /// Returns the user's persona vector, recomputing it when missing or older
    /// than the TTL.
    ///
    /// `None` means cold start: the user has no usable history, or the
    /// recomputation failed and there was no earlier vector to fall back to.
    /// This never returns an error.
    pub async fn get_or_create_persona_vector(&self, user_id: i64) -> Option<PersonaVector> {
        self.get_or_create_at(user_id, Utc::now()).await
    }

    async fn get_or_create_at(&self, user_id: i64, now: DateTime<Utc>) -> Option<PersonaVector> {
        let stored = match self.store.persona_vector(user_id).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Persona lookup failed, recomputing");
                None
            }
        };

        if let Some(persona) = &stored {
            if persona.is_fresh(now, self.ttl) {
                tracing::debug!(user_id, "Persona vector cache hit");
                return stored;
            }
        }

        match self.recompute(user_id, now).await {
            Ok(Some(persona)) => Some(persona),
            Ok(None) => {
                tracing::info!(user_id, "No interaction history, persona unavailable");
                None
            }
            Err(e) => {
                tracing::warn!(
                    user_id,
                    error = %e,
                    reusing_stale = stored.is_some(),
                    "Persona recomputation failed"
                );
                stored
            }
        }
    }

    async fn recompute(&self, user_id: i64, now: DateTime<Utc>) -> AppResult<Option<PersonaVector>> {
        let events = self
            .store
            .recent_interactions(user_id, self.history_limit)
            .await?;
        let events = order_for_persona(events, self.history_limit);
        if events.is_empty() {
            return Ok(None);
        }

        let mut seen = HashSet::new();
        let video_ids: Vec<i64> = events
            .iter()
            .map(|event| event.video_id)
            .filter(|id| seen.insert(*id))
            .collect();

        let mut videos: HashMap<i64, Video> = self
            .store
            .videos_by_ids(&video_ids)
            .await?
            .into_iter()
            .map(|video| (video.id, video))
            .collect();
        let texts: Vec<String> = video_ids
            .iter()
            .filter_map(|id| videos.remove(id))
            .map(|video| video.embedding_text())
            .collect();
        if texts.is_empty() {
            return Err(AppError::NotFound(format!(
                "none of the {} interacted videos exist",
                video_ids.len()
            )));
        }

        let embeddings: Vec<Vec<f32>> = self
            .gateway
            .embed_batch(&texts)
            .await?
            .into_iter()
            .flatten()
            .collect();
        let failed = texts.len() - embeddings.len();
        if failed > 0 {
            tracing::warn!(user_id, failed, total = texts.len(), "Some item embeddings failed");
        }

        let vector = mean_pool(&embeddings).ok_or_else(|| {
            AppError::Embedding(format!("no embeddings returned for user {}", user_id))
        })?;

        let persona = PersonaVector {
            user_id,
            vector,
            updated_at: now,
        };
        self.store.upsert_persona_vector(&persona).await?;

        tracing::info!(
            user_id,
            events = events.len(),
            pooled = embeddings.len(),
            dimension = persona.vector.len(),
            "Persona vector recomputed"
        );

        Ok(Some(persona))
    }
}
