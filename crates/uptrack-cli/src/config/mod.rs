//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── server: ServerConfig          # Host, port, TLS, shutdown
//! ├── middleware: MiddlewareConfig  # Request timeout, body limit
//! ├── service: ServiceConfig        # Token store, NATS, storage, token minting
//! └── log_format: LogFormat         # text or json
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.

mod middleware;
mod server;

use std::process;

use anyhow::{Context, anyhow};
use clap::{Parser, ValueEnum};
pub use middleware::MiddlewareConfig;
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use uptrack_server::service::ServiceConfig;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Output format of the log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[derive(strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "uptrack")]
#[command(about = "Upload server with pollable progress tokens")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// HTTP middleware configuration (timeouts, body limits).
    #[clap(flatten)]
    pub middleware: MiddlewareConfig,

    /// Token store, object storage and token minting configuration.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Installs the global tracing subscriber.
    ///
    /// The filter comes from `RUST_LOG` and defaults to `info`.
    pub fn init_tracing(&self) -> anyhow::Result<()> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .context("failed to create env filter")?;

        let registry = tracing_subscriber::registry().with(filter);
        let result = match self.log_format {
            LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
            LogFormat::Json => registry
                .with(fmt::layer().json().with_target(true))
                .try_init(),
        };

        result.map_err(|e| anyhow!("failed to initialize tracing: {e}"))
    }

    /// Validates every section, naming the section that failed.
    pub fn validate(&self) -> anyhow::Result<()> {
        let sections = [
            ("server", self.server.validate()),
            ("middleware", self.middleware.validate()),
            ("service", self.service.validate()),
        ];

        for (section, result) in sections {
            result.map_err(|reason| anyhow!("invalid {section} configuration: {reason}"))?;
        }

        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        self.server.log();
        self.middleware.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            token_store = %self.service.token_store,
            progress_namespace = %self.service.progress_namespace,
            progress_expiry_secs = self.service.progress_expiry_secs,
            token_algorithm = %self.service.token_algorithm,
            token_salt_pinned = self.service.token_salt.is_some(),
            storage_backend = %self.service.storage.backend_name(),
            log_format = %self.log_format,
            "Service configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [
            cfg!(feature = "tls").then_some("tls"),
            cfg!(feature = "dotenv").then_some("dotenv"),
            cfg!(feature = "fs").then_some("fs"),
            cfg!(feature = "gcs").then_some("gcs"),
            cfg!(feature = "s3").then_some("s3"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
