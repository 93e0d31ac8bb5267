use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;

use crate::error::{AppError, AppResult};

/// TTL for composed personalized scores (1 hour)
pub const PERSONALIZED_SCORE_TTL: u64 = 3600;

/// Upper bound on a single backend call before it counts as failed
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(250);

/// Cache keys, one variant per (subject, object) pair the engine caches
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A user's explicit preferences; no expiry, invalidated on write
    UserPreferences(i64),
    /// A video's static metadata; no expiry
    VideoFeatures(i64),
    /// A composed score breakdown for one (user, video) pair
    PersonalizedScore { user_id: i64, video_id: i64 },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::UserPreferences(user_id) => write!(f, "user:{}:preferences", user_id),
            CacheKey::VideoFeatures(video_id) => write!(f, "video:{}:features", video_id),
            CacheKey::PersonalizedScore { user_id, video_id } => {
                write!(f, "user:{}:video:{}:score", user_id, video_id)
            }
        }
    }
}

/// Raw key-value store behind [`Cache`]
///
/// Implementations may fail freely; [`Cache`] never lets a backend error reach
/// its caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Stores `value`; `ttl` of `None` means no expiry
    async fn set(&self, key: &str, value: String, ttl: Option<u64>) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: Option<u64>,
}

/// Best-effort read-through cache
///
/// Reads that fail or stall past the operation timeout are treated as misses
/// and writes that fail are logged and dropped, so an unavailable backend only
/// costs recomputation.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
    op_timeout: Duration,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task to flush queued writes and stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a cache over `backend` and spawns its background writer task
    pub async fn new(backend: Arc<dyn CacheBackend>) -> (Self, CacheWriterHandle) {
        Self::with_timeout(backend, DEFAULT_CACHE_TIMEOUT).await
    }

    /// Like [`Cache::new`], bounding every backend call by `op_timeout`
    pub async fn with_timeout(
        backend: Arc<dyn CacheBackend>,
        op_timeout: Duration,
    ) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer_backend = backend.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(writer_backend, op_timeout, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            backend,
            write_tx,
            op_timeout,
        };
        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
    }

    async fn cache_writer_task(
        backend: Arc<dyn CacheBackend>,
        op_timeout: Duration,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(backend = backend.name(), "Cache writer task started");
        let mut failed_writes: u64 = 0;

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = bounded(op_timeout, backend.set(&msg.key, msg.value, msg.ttl)).await {
                        failed_writes += 1;
                        tracing::warn!(error = %e, key = %msg.key, "Failed to write to cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!(failed_writes, "Cache writer shutting down, flushing queued writes");

                    // Only what is already queued; live Cache clones keep the channel open.
                    while let Ok(msg) = write_rx.try_recv() {
                        if let Err(e) = bounded(op_timeout, backend.set(&msg.key, msg.value, msg.ttl)).await {
                            tracing::warn!(error = %e, key = %msg.key, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Reads and deserializes a cached value; any failure is a miss
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let key = key.to_string();
        let cached = match bounded(self.op_timeout, self.backend.get(&key)).await {
            Ok(cached) => cached?,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, backend = self.backend.name(), "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&cached) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Writes a value and waits for the backend; failures are logged only
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Option<u64>) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let key = key.to_string();
        if let Err(e) = bounded(self.op_timeout, self.backend.set(&key, json, ttl)).await {
            tracing::warn!(error = %e, key = %key, "Cache write failed");
        }
    }

    /// Queues a write for the background writer and returns immediately
    pub fn set_in_background<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Option<u64>) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::warn!(error = %e, "Failed to queue cache write");
        }
    }

    /// Drops a cached entry after its source of truth changed
    pub async fn invalidate(&self, key: &CacheKey) {
        let key = key.to_string();
        if let Err(e) = bounded(self.op_timeout, self.backend.delete(&key)).await {
            tracing::warn!(error = %e, key = %key, "Cache invalidation failed");
        }
    }

    /// Returns the cached value for `key`, or computes, queues a cache write
    /// and returns the fresh value.
    ///
    /// Errors from `compute` propagate; cache errors never do. Concurrent
    /// misses on one key may each compute, and the last write wins.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Option<u64>,
        compute: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if let Some(cached) = self.get(key).await {
            tracing::debug!(key = %key, "Cache hit");
            return Ok(cached);
        }

        tracing::debug!(key = %key, "Cache miss");
        let value = compute().await?;
        self.set_in_background(key, &value, ttl);
        Ok(value)
    }
}

/// Runs one backend call, turning a stall past `limit` into an error
async fn bounded<T>(limit: Duration, op: impl Future<Output = AppResult<T>>) -> AppResult<T> {
    tokio::time::timeout(limit, op)
        .await
        .map_err(|_| AppError::Internal(format!("cache call timed out after {:?}", limit)))?
}
