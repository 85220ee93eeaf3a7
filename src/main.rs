use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storefront_api::{
    config::Config,
    db::{create_pool, create_redis_client, run_migrations, Cache, CachedCatalog, PgCatalog, PgPurchaseHistory},
    routes::{create_router, AppState},
    services::{inference::HuggingFaceProvider, RecommendationEngine},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storefront_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    // A missing inference key is fatal at startup, not per request
    let inference = HuggingFaceProvider::from_config(&config)
        .context("Failed to configure inference provider")?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    tracing::info!("Connected to PostgreSQL");

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_handle) = Cache::new(redis_client);

    let catalog = CachedCatalog::new(
        PgCatalog::new(pool.clone()),
        cache,
        config.catalog_cache_ttl_secs,
    );
    let history = PgPurchaseHistory::new(pool);

    let engine = RecommendationEngine::new(Arc::new(catalog), Arc::new(history), Arc::new(inference));
    let app = create_router(AppState::new(engine));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(
        address = %address,
        model = %config.inference_model,
        timeout_secs = config.inference_timeout_secs,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_handle.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
