pub mod cache;
pub mod memory;
pub mod postgres;
pub mod redis;

mod macros;

pub use cache::{Cache, CacheBackend, CacheKey, CacheWriterHandle, PERSONALIZED_SCORE_TTL};
pub use memory::MemoryBackend;
pub use postgres::{create_pool, PgStore};
pub use self::redis::{create_redis_client, RedisBackend};
