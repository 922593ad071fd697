//! Multihost API server

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use multihost_api::{
    config::Config,
    observability::init_tracing,
    routes::create_router,
    routing::{DomainCache, RedisCache, ResolutionCache},
    AppState, HostResolver,
};
use multihost_shared::{create_pool, run_migrations, PgSiteStore, SiteStore};

/// How often expired entries are swept from the in-process cache
const CACHE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;
    init_tracing(config.log_format);

    tracing::info!(
        bind_address = %config.bind_address,
        auto_www = config.resolver.auto_www,
        redirect_on_no_match = config.redirect_on_no_match,
        cache = if config.redis_url.is_some() { "redis" } else { "memory" },
        "Starting multihost-api v{}",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    let store: Arc<dyn SiteStore> = Arc::new(PgSiteStore::new(pool));

    let cache: Arc<dyn ResolutionCache> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisCache::connect_with_ttl(url, config.site_cache_ttl)
                .await
                .context("Failed to connect to Redis")?,
        ),
        None => {
            let cache = Arc::new(DomainCache::with_ttl(config.site_cache_ttl));
            spawn_cache_cleanup(cache.clone());
            cache
        }
    };

    let resolver = HostResolver::with_cache(store.clone(), config.resolver.clone(), cache);

    // A missing default site is fatal: refuse to start rather than fail every request
    if let Some(site) = resolver
        .validate_default()
        .await
        .context("Default site check failed")?
    {
        tracing::info!(site_id = %site.id, domain = %site.domain, "Default site loaded");
    }

    let bind_address = config.bind_address.clone();
    let app = create_router(AppState::new(config, store, resolver));

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn spawn_cache_cleanup(cache: Arc<DomainCache>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = cache.cleanup();
            if removed > 0 {
                tracing::debug!(removed, stats = ?cache.stats(), "Swept expired site cache entries");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
