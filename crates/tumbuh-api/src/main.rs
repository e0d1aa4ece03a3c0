use std::env;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tumbuh_core::config::LayeredConfig;
use tumbuh_llm::Providers;
use tumbuh_pipeline::{Aggregator, HyperlocalService, MetricCatalog, PipelineOrchestrator};
use tumbuh_store::{AreaStore, MemoryAreaStore, PostgresConfig, PostgresStore};

use tumbuh_api::{create_router, ApiConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tumbuh_api=info,tumbuh_pipeline=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_config = ApiConfig::from_env();

    let config = LayeredConfig::with_defaults()
        .load_from_dir_if_present(env::current_dir()?)?
        .load_from_env();
    config.validate()?;
    let pipeline_config = config.pipeline_config();

    tracing::info!(
        port = api_config.port,
        workers = pipeline_config.workers,
        max_tiles = pipeline_config.max_tiles,
        default_tile_size = pipeline_config.default_tile_size,
        "Starting Tumbuh API server"
    );

    let api_key = env::var("GOOGLE_API_KEY").unwrap_or_default();
    let providers = Providers::from_config(&config, &api_key)
        .context("GOOGLE_API_KEY must be set to reach the Gemini API")?;

    let store: Arc<dyn AreaStore> = if api_config.uses_postgres() {
        tracing::info!("DATABASE_URL found, connecting to PostgreSQL...");
        let pg_config = PostgresConfig::from_env().context("Invalid DATABASE_URL")?;
        let store = PostgresStore::new(pg_config).await.context(
            "Failed to connect to PostgreSQL. Ensure it is running and DATABASE_URL is correct",
        )?;
        Arc::new(store)
    } else {
        tracing::info!("Using in-memory storage (set DATABASE_URL for PostgreSQL)");
        Arc::new(MemoryAreaStore::new())
    };

    let catalog = MetricCatalog::from_config(&config).context("Invalid [metrics] table")?;
    let orchestrator = PipelineOrchestrator::new(
        store.clone(),
        providers.variables,
        providers.recommender,
        pipeline_config,
    )
    .with_aggregator(Aggregator::new(catalog));
    let hyperlocal = HyperlocalService::new(store, providers.insights);
    let state = Arc::new(AppState::new(orchestrator, hyperlocal));

    let origin: HeaderValue = api_config
        .cors_origin
        .parse()
        .with_context(|| format!("Invalid CORS origin: {}", api_config.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = create_router(state).layer(cors);

    let addr = api_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);
    tracing::info!("CORS enabled for {}", api_config.cors_origin);

    axum::serve(listener, app).await?;
    Ok(())
}
