//! Server startup and graceful shutdown

use crate::state::AppState;
use anyhow::{Context, Result};
use axum::Router;
use commutator_core::Config;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Serve until SIGINT/SIGTERM, give in-flight requests the grace period, then release
/// the file store and the database.
pub async fn start_server(config: &Config, state: Arc<AppState>, app: Router) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port());
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        max_file_mb = config.max_file_size_bytes() / 1024 / 1024,
        temp_dir = %config.temp_storage_dir().display(),
        grace_secs = config.shutdown_grace().as_secs(),
        "Server ready and accepting connections"
    );

    let signalled = CancellationToken::new();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(signalled.clone()))
    .into_future();

    let grace = config.shutdown_grace();
    let grace_elapsed = async {
        signalled.cancelled().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => result.context("Server error")?,
        _ = grace_elapsed => {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Grace period elapsed; abandoning in-flight requests"
            );
        }
    }

    shutdown_state(&state).await;
    Ok(())
}

/// Stop background loops, abandon pending file timers and close the pool.
pub async fn shutdown_state(state: &AppState) {
    state.background.cancel();
    state.delivery.uploads.shutdown().await;
    state.db.database.close().await;
    tracing::info!("Shutdown complete");
}

/// Resolves on Ctrl+C (SIGINT) or SIGTERM and marks `signalled`.
///
/// A handler that cannot be installed is logged and simply never fires.
async fn shutdown_signal(signalled: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
    signalled.cancel();
}
