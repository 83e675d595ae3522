use anyhow::Context;
use log::info;
use migration_audit::{
    api,
    config::Config,
    models::AppState,
    services::{spawn_staleness_watchdog, ProjectRegistry, RunnerClient},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // initialize tracing; `log` records are bridged in by tracing-subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let registry = Arc::new(ProjectRegistry::from_config(&config));
    let runner = config.runner_url.clone().map(RunnerClient::new);
    match &config.runner_url {
        Some(url) => info!("Polling job runner at {}", url),
        None => info!("API_URL not set; waiting for snapshots to be pushed"),
    }

    let _watchdog = spawn_staleness_watchdog(registry.clone(), config.sweep_interval);

    let app = api::router(AppState {
        registry,
        runner,
        poll_interval: config.poll_interval,
    });

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🚀 Server running on http://{}", config.bind_addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
