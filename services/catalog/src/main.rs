use anyhow::{Context, Result};
use catalog_service::api::{start_api_server, AppState};
use catalog_service::config::StorageBackend;
use catalog_service::{
    AssetStore, Catalog, Config, DiskCache, MemoryObjectStore, ObjectStore, PgRepository,
    Repository, S3ObjectStore, UrlResolver,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        "Starting Bazaar Catalog Service"
    );

    init_metrics(config.service.metrics_port)?;

    let repository = PgRepository::connect(&config.database)
        .await
        .context("Failed to initialize repository")?;

    if config.database.run_migrations {
        repository
            .run_migrations()
            .await
            .context("Failed to run database migrations")?;
    }

    let remote: Arc<dyn ObjectStore> = match config.storage.backend {
        StorageBackend::S3 => Arc::new(
            S3ObjectStore::new(&config.s3)
                .await
                .context("Failed to initialize S3 object store")?,
        ),
        StorageBackend::Memory => {
            warn!("Using in-memory object store; images are lost on restart");
            Arc::new(MemoryObjectStore::new())
        }
    };

    let cache = DiskCache::open(&config.cache.dir)
        .await
        .context("Failed to open asset cache directory")?;

    let resolver = UrlResolver::from_config(&config.assets, &config.s3);
    let assets = Arc::new(AssetStore::new(remote, cache, resolver));
    let repo: Arc<dyn Repository> = Arc::new(repository);

    let state = AppState {
        catalog: Catalog::new(repo.clone(), assets.clone()),
        assets,
        repo,
    };

    start_api_server(state, &config.api, shutdown_signal()).await?;

    info!("Catalog service stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Shutting down catalog service");
}
