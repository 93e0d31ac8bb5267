use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use redis::Client;

use crate::db::cache::CacheBackend;
use crate::error::AppResult;

/// Creates a Redis client for caching
///
/// Opening a client does not connect; connections are made per operation, so
/// an unreachable Redis only surfaces as failed cache calls.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

const CONNECTION_TIMEOUT: Duration = Duration::from_millis(200);
const RESPONSE_TIMEOUT: Duration = Duration::from_millis(200);

/// Redis-backed cache storage
#[derive(Clone)]
pub struct RedisBackend {
    redis_client: Client,
}

impl RedisBackend {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        let conn = self
            .redis_client
            .get_multiplexed_async_connection_with_timeouts(RESPONSE_TIMEOUT, CONNECTION_TIMEOUT)
            .await?;
        Ok(conn)
    }
}

#[async_trait::async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection().await?;
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<u64>) -> AppResult<()> {
        let mut conn = self.connection().await?;
        match ttl {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

// Ignored tests need a running Redis at REDIS_URL.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::cache::{Cache, CacheKey};
    use std::sync::Arc;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    #[tokio::test]
    #[ignore]
    async fn test_cache_miss() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(Arc::new(RedisBackend::new(client))).await;

        let key = CacheKey::VideoFeatures(-12345);
        let retrieved: Option<Vec<String>> = cache.get(&key).await;

        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore]
    async fn test_set_with_and_without_ttl() {
        let client = create_redis_client(&redis_url()).unwrap();
        let backend = RedisBackend::new(client.clone());

        backend.set("test:no_ttl", "a".to_string(), None).await.unwrap();
        backend.set("test:ttl", "b".to_string(), Some(60)).await.unwrap();

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let no_ttl: i64 = conn.ttl("test:no_ttl").await.unwrap();
        let with_ttl: i64 = conn.ttl("test:ttl").await.unwrap();
        assert_eq!(no_ttl, -1);
        assert!(with_ttl > 0 && with_ttl <= 60);

        backend.delete("test:no_ttl").await.unwrap();
        backend.delete("test:ttl").await.unwrap();
        assert_eq!(backend.get("test:ttl").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_silent_redis_does_not_block_compute() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = create_redis_client(&format!("redis://{}", addr)).unwrap();
        let (cache, _handle) = Cache::new(Arc::new(RedisBackend::new(client))).await;

        let value: i64 = tokio::time::timeout(
            Duration::from_secs(5),
            cache.get_or_compute(&CacheKey::VideoFeatures(1), None, || async { Ok(42) }),
        )
        .await
        .expect("silent redis blocked the caller")
        .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_a_miss() {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, _handle) = Cache::new(Arc::new(RedisBackend::new(client))).await;

        let value: i64 = cache
            .get_or_compute(&CacheKey::VideoFeatures(1), None, || async { Ok(5) })
            .await
            .unwrap();
        assert_eq!(value, 5);
    }
}
