//! # Canteen API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Canteen API Server                               │
//! │                                                                         │
//! │  Customer / Staff app ───► HTTP (5500) ───► Services ───► SQLite        │
//! │                                                 │                       │
//! │                                                 ▼                       │
//! │                                         BackgroundTasks                 │
//! │                                         (drained on shutdown)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use canteen_api::{router, ApiConfig, AppState};
use canteen_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,canteen_api=debug,canteen_db=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting Canteen API server...");

    let config = ApiConfig::load().context("loading configuration")?;
    info!(
        port = config.port,
        db_url = %config.database_url,
        utc_offset_minutes = config.business_utc_offset_minutes,
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(config.database_url.clone()).max_connections(config.database_max_connections))
        .await
        .context("connecting to database")?;
    info!("Database ready");

    let addr = config.bind_address();
    let state = AppState::new(db.clone(), config);
    let tasks = state.tasks().clone();
    let app = router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(pending = tasks.pending(), "Waiting for background tasks");
    tasks.drain().await;
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
