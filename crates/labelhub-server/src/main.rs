//! Labelhub Server - Main entry point

use anyhow::{Context, Result};
use labelhub_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use labelhub_server::{
    api,
    config::{Config, GuardBackend},
    db,
    deletion::{
        DatasetDeleter, DeletionGuard, InMemoryDeletionGuard, PgAdvisoryDeletionGuard,
        PgRelationalStore,
    },
    features::FeatureState,
    storage::{config::StorageConfig, Storage},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("labelhub-server".to_string())
        .filter_directives("labelhub_server=debug,tower_http=debug,sqlx=warn".to_string())
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Labelhub Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let db_pool = db::create_pool(&config.database)
        .await
        .context("Failed to create database pool")?;

    let storage_config = StorageConfig::from_env()?;
    let storage = Storage::new(storage_config).await?;
    info!(bucket = storage.bucket(), "Storage client initialized");

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .context("Failed to run migrations")?;

    info!("Database migrations completed");

    let guard: Arc<dyn DeletionGuard> = match config.deletion.guard {
        GuardBackend::Memory => Arc::new(InMemoryDeletionGuard::new()),
        GuardBackend::Advisory => {
            let guard_pool = db::create_pool(&config.deletion.guard_pool(&config.database))
                .await
                .context("Failed to create deletion guard pool")?;
            Arc::new(PgAdvisoryDeletionGuard::new(guard_pool))
        },
    };
    info!(
        guard = ?config.deletion.guard,
        step_timeout_secs = config.deletion.step_timeout_secs,
        "Dataset deletion configured"
    );

    let deleter = DatasetDeleter::new(
        Arc::new(PgRelationalStore::new(db_pool.clone())),
        Arc::new(storage),
        guard,
    )
    .with_step_timeout(config.deletion.step_timeout());

    let state = FeatureState {
        db: db_pool,
        deleter,
    };

    let app = api::create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let drain_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    if api::serve_with_drain(listener, app, shutdown_signal(), drain_timeout).await? {
        info!("Server shut down gracefully");
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
