// Worker process: polls the outbox and provisions billing workspaces

use std::error::Error;
use std::sync::Arc;

use billing_provisioner::adapters::{postgres, OutboxConsumer, PostgresEventStore};
use billing_provisioner::config::{AppConfig, LogFormat, LoggingConfig};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Load configuration
    let config = AppConfig::load()?;
    init_tracing(&config.logging);
    config.validate()?;
    tracing::info!(environment = ?config.logging.environment, "Configuration loaded");

    // Connect to database
    tracing::info!(url = %config.database.redacted_url(), "Connecting to database");
    let pool = postgres::connect(&config.database).await?;

    if config.database.run_migrations {
        tracing::info!("Running database migrations");
        postgres::run_migrations(&pool).await?;
    }

    // Start consumer
    let store = Arc::new(PostgresEventStore::new(pool.clone()));
    let consumer = OutboxConsumer::with_config(store, config.consumer.to_consumer_config());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(async move { consumer.run(shutdown_rx).await });

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, draining final batch");
    let _ = shutdown_tx.send(true);

    worker.await?;
    pool.close().await;
    tracing::info!("Billing provisioner stopped");

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(logging.env_filter());

    match logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
