use std::sync::Arc;

use dataset_registry::config::RegistryConfig;
use dataset_registry::database::DatabaseManager;
use dataset_registry::storage::{DatasetStore, MemoryDatasetStore};
use dataset_registry::{DatasetRegistry, HttpServer};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dataset_registry=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Dataset Registry v{}", env!("CARGO_PKG_VERSION"));

    let config = RegistryConfig::from_env()?;

    info!("Configuration loaded:");
    info!("  Listen address: {}", config.listen_addr);
    match config.redacted_database_url() {
        Some(url) => info!("  Database URL: {}", url),
        None => info!("  Database URL: <none>"),
    }

    let store: Arc<dyn DatasetStore> = match &config.database_url {
        Some(url) => Arc::new(DatabaseManager::new(url, config.database_pool_size).await?),
        None => {
            warn!("DATABASE_URL is not set; datasets will be kept in memory only");
            Arc::new(MemoryDatasetStore::new())
        }
    };

    let registry = Arc::new(DatasetRegistry::new(store));
    info!("Dataset registry initialized successfully");

    let server = HttpServer::new(registry);
    server.start(config.listen_addr, shutdown_signal()).await?;

    info!("Dataset Registry shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, gracefully shutting down...");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    }
}
