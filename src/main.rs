use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use travel_search::api::{self, app_state::AppState};
use travel_search::config::loader::ConfigLoader;
use travel_search::models::inventory::Inventory;
use travel_search::observability::{
    AppMetrics, ObservabilityState, create_observability_router, init_tracing,
};
use travel_search::security::rate_limit::{RateLimiter, spawn_sweeper};
use travel_search::security::validation::RequestValidator;
use travel_search::services::{create_ai_client, create_search_service};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging);

    info!("Starting travel-search...");

    ConfigLoader::validate(&config).context("invalid configuration")?;
    info!(provider = %config.provider.kind, model = %config.provider.model, "Configuration loaded successfully");

    let inventory = Arc::new(Inventory::sample());
    info!("Inventory loaded with {} destinations", inventory.len());

    let ai_client = create_ai_client(&config.provider).context("failed to create AI client")?;
    info!("AI client initialized");

    let metrics = Arc::new(AppMetrics::default());

    let search_service = create_search_service(
        Arc::from(ai_client),
        inventory.clone(),
        config.search.fallback_enabled,
        metrics.clone(),
    );
    info!(
        fallback_enabled = config.search.fallback_enabled,
        "Search service initialized"
    );

    let app_state = AppState::new(
        search_service,
        RateLimiter::from_settings(&config.rate_limit),
        RequestValidator::new().with_max_query_length(config.search.max_query_length),
        metrics.clone(),
    );
    info!("Application state created");

    let _sweeper = spawn_sweeper(
        app_state.rate_limiter.clone(),
        Duration::from_secs(config.rate_limit.sweep_interval_seconds.max(1)),
    );

    let observability_state = Arc::new(ObservabilityState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        metrics,
        config.provider.kind.to_string(),
        inventory.len(),
    ));
    let router = create_observability_router(observability_state).merge(api::create_router(app_state));
    info!("API router created with observability endpoints");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
