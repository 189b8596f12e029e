//! Shutdown on SIGINT or SIGTERM.

use std::future::pending;

use tokio::signal;

use crate::TRACING_TARGET_SERVER_SHUTDOWN;

/// Resolves once the process is asked to stop.
///
/// A handler that fails to install is logged and then never fires, so the
/// other signal still works.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(target: TRACING_TARGET_SERVER_SHUTDOWN, error = %err, "Cannot listen for SIGINT");
            pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(target: TRACING_TARGET_SERVER_SHUTDOWN, error = %err, "Cannot listen for SIGTERM");
                pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    let received = tokio::select! {
        () = interrupt => "SIGINT",
        () = terminate => "SIGTERM",
    };

    tracing::info!(target: TRACING_TARGET_SERVER_SHUTDOWN, signal = received, "Shutdown requested, draining connections");
}
