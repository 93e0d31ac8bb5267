#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};

use travel_recommender::{
    db::{Cache, CacheWriterHandle, MemoryBackend},
    error::{AppError, AppResult},
    models::{
        InteractionEvent, InteractionKind, PersonaVector, RankingCandidate, UserPreferences, Video,
        VideoSignals,
    },
    services::{EmbeddingGateway, EngineSettings, RecommendationEngine, Store},
};

#[derive(Default)]
struct StoreData {
    videos: Vec<Video>,
    interactions: Vec<InteractionEvent>,
    personas: HashMap<i64, PersonaVector>,
    preferences: HashMap<i64, UserPreferences>,
    signals: HashMap<i64, VideoSignals>,
    ranking_candidates: Vec<RankingCandidate>,
    saved_embeddings: HashMap<i64, Vec<f32>>,
}

/// Store backed by plain collections
#[derive(Default)]
pub struct InMemoryStore {
    data: Mutex<StoreData>,
    preference_read_delay: Mutex<Option<std::time::Duration>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_video(&self, video: Video) {
        self.data.lock().unwrap().videos.push(video);
    }

    pub fn add_interaction(&self, user_id: i64, video_id: i64, liked: bool, watch_time: f64) {
        let mut data = self.data.lock().unwrap();
        let minutes_ago = data.interactions.len() as i64;
        data.interactions.push(InteractionEvent {
            user_id,
            video_id,
            kind: if liked {
                InteractionKind::Like
            } else {
                InteractionKind::Watch
            },
            watch_time: Some(watch_time),
            liked,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        });
    }

    pub fn set_preferences(&self, user_id: i64, preferences: UserPreferences) {
        self.data
            .lock()
            .unwrap()
            .preferences
            .insert(user_id, preferences);
    }

    pub fn set_signals(&self, signals: VideoSignals) {
        self.data
            .lock()
            .unwrap()
            .signals
            .insert(signals.video_id, signals);
    }

    pub fn add_ranking_candidate(&self, candidate: RankingCandidate) {
        self.data.lock().unwrap().ranking_candidates.push(candidate);
    }

    /// Makes preference reads take their snapshot, then wait `delay`
    pub fn set_preference_read_delay(&self, delay: std::time::Duration) {
        *self.preference_read_delay.lock().unwrap() = Some(delay);
    }

    pub fn saved_embedding(&self, video_id: i64) -> Option<Vec<f32>> {
        self.data
            .lock()
            .unwrap()
            .saved_embeddings
            .get(&video_id)
            .cloned()
    }

    pub fn stored_persona(&self, user_id: i64) -> Option<PersonaVector> {
        self.data.lock().unwrap().personas.get(&user_id).cloned()
    }
}

#[async_trait::async_trait]
impl Store for InMemoryStore {
    async fn recent_interactions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> AppResult<Vec<InteractionEvent>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .interactions
            .iter()
            .filter(|event| event.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn video(&self, video_id: i64) -> AppResult<Option<Video>> {
        let data = self.data.lock().unwrap();
        Ok(data.videos.iter().find(|v| v.id == video_id).cloned())
    }

    async fn videos_by_ids(&self, video_ids: &[i64]) -> AppResult<Vec<Video>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .videos
            .iter()
            .filter(|v| video_ids.contains(&v.id))
            .cloned()
            .collect())
    }

    async fn candidate_videos(&self, limit: usize) -> AppResult<Vec<Video>> {
        let data = self.data.lock().unwrap();
        Ok(data.videos.iter().take(limit).cloned().collect())
    }

    async fn viewed_video_ids(&self, user_id: i64) -> AppResult<Vec<i64>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .interactions
            .iter()
            .filter(|event| event.user_id == user_id)
            .map(|event| event.video_id)
            .collect())
    }

    async fn save_video_embedding(&self, video_id: i64, embedding: &[f32]) -> AppResult<()> {
        let mut data = self.data.lock().unwrap();
        data.saved_embeddings.insert(video_id, embedding.to_vec());
        if let Some(video) = data.videos.iter_mut().find(|v| v.id == video_id) {
            video.embedding = Some(embedding.to_vec());
        }
        Ok(())
    }

    async fn persona_vector(&self, user_id: i64) -> AppResult<Option<PersonaVector>> {
        Ok(self.data.lock().unwrap().personas.get(&user_id).cloned())
    }

    async fn upsert_persona_vector(&self, persona: &PersonaVector) -> AppResult<()> {
        self.data
            .lock()
            .unwrap()
            .personas
            .insert(persona.user_id, persona.clone());
        Ok(())
    }

    async fn user_preferences(&self, user_id: i64) -> AppResult<Option<UserPreferences>> {
        let snapshot = self.data.lock().unwrap().preferences.get(&user_id).cloned();
        let delay = *self.preference_read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(snapshot)
    }

    async fn save_user_preferences(
        &self,
        user_id: i64,
        preferences: &UserPreferences,
    ) -> AppResult<()> {
        self.set_preferences(user_id, preferences.clone());
        Ok(())
    }

    async fn video_signals(&self, video_id: i64) -> AppResult<Option<VideoSignals>> {
        Ok(self.data.lock().unwrap().signals.get(&video_id).cloned())
    }

    async fn ranking_candidates(&self, limit: usize) -> AppResult<Vec<RankingCandidate>> {
        let data = self.data.lock().unwrap();
        Ok(data.ranking_candidates.iter().take(limit).cloned().collect())
    }
}

/// Words the fake gateway turns into embedding axes
const AXES: [&str; 3] = ["beach", "mountain", "market"];

/// Embeds a text as a bag of [`AXES`] words plus a small constant component
pub struct KeywordGateway {
    calls: AtomicUsize,
    fail: bool,
}

impl KeywordGateway {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn embed_text(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = AXES
            .iter()
            .map(|axis| if lower.contains(axis) { 1.0 } else { 0.0 })
            .collect();
        vector.push(0.1);
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingGateway for KeywordGateway {
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Option<Vec<f32>>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Embedding("gateway unavailable".to_string()));
        }
        Ok(texts
            .iter()
            .map(|text| Some(Self::embed_text(text)))
            .collect())
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

pub fn video(id: i64, title: &str, tags: &[&str], region: Option<&str>, view_count: i64) -> Video {
    Video {
        id,
        title: title.to_string(),
        description: String::new(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        region: region.map(str::to_string),
        keyword: None,
        duration_secs: Some(600),
        view_count,
        like_count: 0,
        embedding: None,
    }
}

/// A small catalogue: two beach videos, a mountain video, a market video and
/// a clip too short to recommend
pub fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.add_video(video(1, "Haeundae beach sunset", &["beach", "sunset"], Some("busan"), 1200));
    store.add_video(video(2, "Gwangalli beach night walk", &["beach", "night"], Some("busan"), 300));
    store.add_video(video(3, "Seorak mountain hike", &["mountain", "hiking"], Some("sokcho"), 5000));
    store.add_video(video(4, "Jagalchi market food tour", &["market", "food"], Some("busan"), 800));
    let mut short = video(5, "Beach in ten seconds", &["beach"], Some("busan"), 90_000);
    short.duration_secs = Some(10);
    store.add_video(short);
    store
}

pub struct TestEngine {
    pub engine: Arc<RecommendationEngine>,
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<KeywordGateway>,
    pub cache_writer: CacheWriterHandle,
}

pub async fn build_engine(store: InMemoryStore, gateway: KeywordGateway) -> TestEngine {
    let store = Arc::new(store);
    let gateway = Arc::new(gateway);
    let (cache, cache_writer) = Cache::new(Arc::new(MemoryBackend::new())).await;

    let engine = Arc::new(RecommendationEngine::new(
        store.clone(),
        gateway.clone(),
        cache,
        EngineSettings::default(),
    ));

    TestEngine {
        engine,
        store,
        gateway,
        cache_writer,
    }
}

/// Lets the background cache writer drain
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
}
