use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use travel_recommender::{
    config::{CacheBackendKind, Config},
    db::{create_pool, create_redis_client, Cache, CacheBackend, MemoryBackend, PgStore, RedisBackend},
    routes::{create_router, AppState},
    services::{HttpEmbeddingGateway, RecommendationEngine},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "travel_recommender=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(pool));

    let backend: Arc<dyn CacheBackend> = match config.cache_backend {
        CacheBackendKind::Redis => {
            Arc::new(RedisBackend::new(create_redis_client(&config.redis_url)?))
        }
        CacheBackendKind::Memory => Arc::new(MemoryBackend::new()),
    };
    let (cache, cache_writer) = Cache::with_timeout(backend, config.cache_timeout()).await;

    let gateway = Arc::new(HttpEmbeddingGateway::new(
        config.embedding_api_url.clone(),
        config.embedding_api_key.clone(),
    ));

    let engine = Arc::new(RecommendationEngine::new(
        store,
        gateway,
        cache,
        config.engine_settings()?,
    ));
    let app = create_router(AppState::new(engine));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(
        addr = %addr,
        cache_backend = ?config.cache_backend,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cache_writer.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
