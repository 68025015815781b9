/*
 * Responsibility
 * - axum::serve with graceful shutdown
 * - Bounded drain: after the shutdown signal, in-flight requests get `grace`; then serve returns
 *   and connections still open are dropped with the runtime when main exits
 * - SIGINT / SIGTERM as the shutdown signal
 */
use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;

pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    grace: Duration,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (drain_tx, mut drain_rx) = watch::channel(false);

    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = drain_rx.wait_for(|draining| *draining).await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => {
            // The server stopped on its own, before any shutdown signal.
            joined??;
            return Ok(());
        }
        _ = shutdown => {
            tracing::info!(grace_secs = grace.as_secs_f64(), "shutdown signal received, draining");
        }
    }

    let _ = drain_tx.send(true);

    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => {
            joined??;
            tracing::info!("server shutdown");
        }
        Err(_) => {
            // Stops the accept loop only; open connection tasks end with the runtime
            tracing::warn!("graceful shutdown timed out, abandoning in-flight requests");
            server.abort();
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C (SIGINT) or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
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
