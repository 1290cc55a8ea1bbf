use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use playgraph_api::{
    config::Config,
    db::{self, Cache},
    routes::{create_router, AppState},
    services::{FactProvider, InMemoryGraph, PgFactProvider, Recommender},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("playgraph_api=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;

    let provider = build_fact_provider(&config).await?;
    let mut recommender = Recommender::new(provider, config.max_results_limit)
        .await
        .context("Failed to build category index")?;
    if let Some(deadline) = config.scoring_deadline() {
        recommender = recommender.with_deadline(deadline);
    }

    let mut state = AppState::new(Arc::new(recommender), &config);

    let cache_writer = match &config.redis_url {
        Some(redis_url) => {
            let client = db::create_redis_client(redis_url)?;
            let (cache, writer) = Cache::new(client).await;
            state = state.with_cache(cache);
            tracing::info!(ttl_secs = config.recommendation_cache_ttl_secs, "Response cache enabled");
            Some(writer)
        }
        None => {
            tracing::info!("REDIS_URL not set, response cache disabled");
            None
        }
    };

    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    Ok(())
}

/// Seed file when configured, Postgres otherwise
async fn build_fact_provider(config: &Config) -> anyhow::Result<Arc<dyn FactProvider>> {
    if let Some(path) = &config.graph_seed_path {
        let graph = InMemoryGraph::load_seed_file(path)
            .await
            .with_context(|| format!("Failed to load graph seed {}", path))?;
        tracing::info!(path = %path, "Serving in-memory graph");
        return Ok(Arc::new(graph));
    }

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Serving graph from Postgres");
    Ok(Arc::new(PgFactProvider::new(pool)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
