#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process::ExitCode;

use anyhow::Context;
use axum::Router;
use uptrack_server::handler::routes;
use uptrack_server::middleware::RouterExt;
use uptrack_server::service::ServiceState;

use crate::config::{Cli, MiddlewareConfig};

pub const TRACING_TARGET_SERVER_STARTUP: &str = "uptrack_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "uptrack_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "uptrack_cli::config";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Tracing may not be installed yet if configuration failed early.
            if tracing::enabled!(target: TRACING_TARGET_SERVER_SHUTDOWN, tracing::Level::ERROR) {
                tracing::error!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    error = format!("{error:#}"),
                    "uptrack exited with an error"
                );
            } else {
                eprintln!("uptrack: {error:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    cli.init_tracing()?;
    cli.log();
    cli.validate()?;

    let state = ServiceState::from_config(&cli.service)
        .await
        .context("cannot build the upload service")?;

    server::serve(app(state, &cli.middleware), cli.server).await?;
    Ok(())
}

/// Routes wrapped in the middleware stack, innermost first: body limit,
/// error handling with the request timeout, then request IDs and tracing.
fn app(state: ServiceState, middleware: &MiddlewareConfig) -> Router {
    routes()
        .with_state(state)
        .with_body_limit_layer(middleware.max_body_size)
        .with_error_handling_layer(middleware.request_timeout())
        .with_observability_layer()
}
