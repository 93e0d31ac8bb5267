use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::cache::CacheBackend;
use crate::error::AppResult;

/// In-process cache backend with per-entry expiry
///
/// Used when no Redis is configured, and by tests.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, (String, Option<Instant>)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.read().await;
        let value = entries.get(key).and_then(|(value, expires_at)| match expires_at {
            Some(deadline) if Instant::now() >= *deadline => None,
            _ => Some(value.clone()),
        });
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<u64>) -> AppResult<()> {
        let expires_at = ttl.map(|secs| Instant::now() + Duration::from_secs(secs));
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get_without_expiry() {
        let backend = MemoryBackend::new();
        backend.set("k", "v".to_string(), None).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let backend = MemoryBackend::new();
        backend.set("k", "v".to_string(), Some(0)).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let backend = MemoryBackend::new();
        assert!(backend.delete("absent").await.is_ok());
    }
}
