//! Per-request limits applied in front of the handlers.

use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Serialize};
use uptrack_server::middleware::DEFAULT_MAX_BODY_SIZE;

use crate::TRACING_TARGET_CONFIG;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Limits that bound a single request, including the upload body.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Seconds a request may take end to end, upload spooling included (1-3600)
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MAX_BODY_SIZE", default_value_t = DEFAULT_MAX_BODY_SIZE)]
    pub max_body_size: usize,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl MiddlewareConfig {
    #[inline]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(1..=3600).contains(&self.request_timeout_secs) {
            return Err(format!(
                "request timeout of {}s is outside 1-3600",
                self.request_timeout_secs
            ));
        }

        if self.max_body_size == 0 {
            return Err("max body size must be at least one byte".to_owned());
        }

        Ok(())
    }

    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            request_timeout_secs = self.request_timeout_secs,
            max_body_size = self.max_body_size,
            "Middleware configuration"
        );
    }
}
