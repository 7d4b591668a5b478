//! Coach AI inference service entry point

use anyhow::{Context, Result};
use coach_ai_service::{routes, ConfigManager, InferenceService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting Coach AI Service v{}", env!("CARGO_PKG_VERSION"));

    let config_manager = ConfigManager::new().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    let config = config_manager.get_config().clone();
    info!(
        "Running in {} environment",
        config_manager.get_environment().name()
    );

    // No bundle, no service
    let service = InferenceService::load(&config).map_err(|e| {
        error!("Failed to load model bundle: {}", e);
        e
    })?;
    let service = Arc::new(service);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    let (bound, server) = warp::serve(routes(service, &config))
        .try_bind_with_graceful_shutdown(addr, async {
            match signal::ctrl_c().await {
                Ok(()) => info!("Received shutdown signal"),
                Err(err) => error!("Unable to listen for shutdown signal: {}", err),
            }
        })
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on http://{}", bound);
    server.await;

    info!("Coach AI Service stopped gracefully");
    Ok(())
}

fn init_logging() {
    let env = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(env)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
