use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use collection_rest::config;
use collection_rest::engine::{ContentEngine, MemoryEngine};
use collection_rest::router::{app, cors_layer};
use collection_rest::state::{AdapterSettings, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up ENGINE_SECRET, API_PREFIX, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting collection-rest in {:?} mode", config.environment);

    let engine = MemoryEngine::from_config(config)
        .await
        .context("failed to build content engine")?;
    let engine: Arc<dyn ContentEngine> = Arc::new(engine);
    tracing::info!("collections: {}", engine.collections().join(", "));

    let settings = AdapterSettings::from_config(config);
    let prefix = settings.prefix.clone();

    let mut router = app(AppState::new(engine, settings));
    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("listening on http://{} (api prefix '{}')", bind_addr, prefix);

    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
