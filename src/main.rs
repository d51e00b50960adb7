//! foodorders server binary

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use foodorders::api::{self, AppState};
use foodorders::config::{AppConfig, LogFormat};
use foodorders::handler::OrderHandler;
use foodorders::metrics::create_metrics;
use foodorders::storage::{create_storage, OrderStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config)?;

    let storage_config = config
        .storage_runtime()
        .context("invalid storage configuration")?;

    // Store and metrics clients are built once and shared by every request
    let store: Arc<dyn OrderStore> = Arc::from(create_storage(storage_config).await?);
    tracing::info!(storage = %store.describe(), "Order store initialised");

    let (sink, exporter) =
        create_metrics(config.metrics_runtime()).context("failed to initialise metrics")?;

    let handler = Arc::new(
        OrderHandler::new(store, sink).with_price_metric(config.metrics.name.clone()),
    );
    let state = AppState::new(handler).with_exporter(exporter);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!(%addr, "Listening for HTTP traffic");

    api::serve(listener, state, shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.logging.level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("foodorders=info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }

    Ok(())
}
