//! wacrm API Server
//!
//! Run with: cargo run --bin wacrm
//!
//! # Configuration
//!
//! Settings come from the first `config.toml` found in the user config
//! directory, `/etc/wacrm` or the working directory, with environment
//! overrides on top (see `wacrm-cli config`). The WhatsApp credentials
//! `WHATSAPP_TOKEN`, `PHONE_NUMBER_ID` and `WABA_ID` are required.
//! `RUST_LOG` takes precedence over the configured log level.

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wacrm::api::{serve, AppState};
use wacrm::config::{Config, LoggingConfig};
use wacrm::ledger::LedgerStore;
use wacrm::messaging::ReqwestTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default();
    init_tracing(&config.logging);

    tracing::info!("Starting wacrm API server v{}", env!("CARGO_PKG_VERSION"));

    config
        .validate()
        .context("WhatsApp credentials are not configured")?;

    let transport = ReqwestTransport::new(config.whatsapp.request_timeout_ms)
        .context("Failed to build HTTP client")?;

    tracing::info!("Ledger file: {}", config.ledger.path);
    let ledger = LedgerStore::open(&config.ledger.path, config.ledger.max_logs)
        .with_context(|| format!("Failed to open ledger at {}", config.ledger.path))?;

    tracing::info!(
        concurrency = config.batch.concurrency,
        delay_ms = config.batch.delay_ms,
        "Batch pacing"
    );

    let server = config.server.clone();
    let state = AppState::new(config, Arc::new(transport), ledger);

    serve(state, &server).await?;

    tracing::info!("wacrm API server stopped");
    Ok(())
}

/// Install the global subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("wacrm={},tower_http=debug", logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
