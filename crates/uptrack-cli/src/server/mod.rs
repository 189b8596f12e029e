//! Serving the router until the process is asked to stop.
//!
//! HTTPS is used when the `tls` feature is on and both PEM paths are set;
//! otherwise the router is served over plain HTTP. Either way in-flight
//! requests get the configured shutdown timeout to finish.

mod error;
mod shutdown;
#[cfg(feature = "tls")]
mod tls;

use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
pub use error::{ServerError, ServerResult};
use shutdown::shutdown_signal;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::config::ServerConfig;
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Binds the configured address and serves `app`.
pub async fn serve(app: Router, config: ServerConfig) -> ServerResult<()> {
    config.validate().map_err(ServerError::Config)?;

    let addr = config.server_addr();
    let grace = config.shutdown_timeout();
    let started = Instant::now();

    #[cfg(feature = "tls")]
    let outcome = match config.tls_paths() {
        Some(paths) => {
            announce(addr, true);
            tls::serve_tls(app, addr, paths, grace).await
        }
        None => serve_plain(app, addr, grace).await,
    };

    #[cfg(not(feature = "tls"))]
    let outcome = serve_plain(app, addr, grace).await;

    let uptime_secs = started.elapsed().as_secs();
    match &outcome {
        Ok(()) => tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            uptime_secs,
            "Server stopped"
        ),
        Err(err) => tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %err,
            hint = err.hint(),
            uptime_secs,
            "Server failed"
        ),
    }

    outcome
}

fn announce(addr: SocketAddr, tls: bool) {
    tracing::info!(target: TRACING_TARGET_SERVER_STARTUP, %addr, tls, "Listening");

    if addr.ip().is_unspecified() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Listening on every interface"
        );
    }
}

async fn serve_plain(app: Router, addr: SocketAddr, grace: Duration) -> ServerResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    announce(addr, false);

    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    drain_after_signal(grace, |stop| {
        axum::serve(listener, service)
            .with_graceful_shutdown(async move { stop.notified().await })
    })
    .await
    .map_err(ServerError::Runtime)
}

/// Runs the server built by `start` and, once a shutdown signal arrives,
/// gives it `grace` to finish before returning anyway.
async fn drain_after_signal<F>(grace: Duration, start: impl FnOnce(Arc<Notify>) -> F) -> io::Result<()>
where
    F: IntoFuture<Output = io::Result<()>>,
{
    let stop = Arc::new(Notify::new());
    let server = start(Arc::clone(&stop)).into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result,
        () = shutdown_signal() => stop.notify_one(),
    }

    match tokio::time::timeout(grace, server).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                grace_secs = grace.as_secs(),
                "Connections still open after the shutdown timeout, exiting anyway"
            );
            Ok(())
        }
    }
}
