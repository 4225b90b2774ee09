//! # permits-api: Binary Entry Point
//!
//! Reads configuration from the environment, picks the store and serves
//! the API on `0.0.0.0:$PORT`.

use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use permits_api::config::{AppConfig, LogFormat};
use permits_api::state::AppState;
use permits_api::store::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    init_tracing(config.log_format);
    tracing::info!(?config, "starting permits-api");

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let state = match &config.database {
        Some(db) => {
            let store = PgStore::connect(db)
                .await
                .context("database initialization failed")?;
            tracing::info!("using PostgreSQL store");
            AppState::with_store(Arc::new(store), config.clone())
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set, running on the in-memory store. \
                 Data will not survive restarts."
            );
            AppState::in_memory(config.clone())
        }
    }
    .with_metrics(metrics);

    let app = permits_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("permits-api listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
