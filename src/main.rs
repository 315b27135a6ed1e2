use anyhow::Context;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use data_structure_service::{Config, DatabaseManager, HttpServer};

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, gracefully shutting down...");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "data_structure_service=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Data Structure Management Service v0.1.0");

    let config = Config::from_env().context("Failed to load configuration")?;
    let addr = config.socket_addr()?;

    info!("Configuration loaded:");
    info!("  HTTP address: {}", addr);
    info!("  Database URL: {}", config.database_url);
    info!("  Pool size: {}", config.pool_size);

    let database = DatabaseManager::new(&config.database_url, config.pool_size)
        .await
        .context("Failed to initialize database")?;
    info!("Database initialized successfully");

    let server = HttpServer::new(database);
    server
        .start(addr, shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Data Structure Management Service shutdown complete");
    Ok(())
}
