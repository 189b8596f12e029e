//! NATS connection configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

const DEFAULT_URL: &str = "nats://127.0.0.1:4222";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Name the token store registers its connection under.
pub(crate) const CLIENT_NAME: &str = "uptrack-token-store";

/// Where the remote token store lives and how long a round trip may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct NatsConfig {
    /// NATS server URL hosting the token bucket
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-url", env = "NATS_URL", default_value = DEFAULT_URL)
    )]
    pub nats_url: String,

    /// Authentication token
    #[cfg_attr(feature = "config", arg(long = "nats-token", env = "NATS_TOKEN"))]
    pub nats_token: Option<String>,

    /// Seconds to wait for the initial connection
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-connect-timeout-secs", env = "NATS_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)
    )]
    pub nats_connect_timeout_secs: u64,

    /// Seconds any single KV call may take before the store reports it unavailable
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-request-timeout-secs", env = "NATS_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)
    )]
    pub nats_request_timeout_secs: u64,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            nats_url: DEFAULT_URL.to_owned(),
            nats_token: None,
            nats_connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            nats_request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl NatsConfig {
    /// Points the configuration at `url`.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.nats_url = url.into();
        self
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.nats_connect_timeout_secs)
    }

    /// Bound applied to every KV round trip.
    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.nats_request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        let url = self.nats_url.trim();
        if !url.starts_with("nats://") && !url.starts_with("tls://") {
            return Err(format!("NATS URL '{url}' must start with nats:// or tls://"));
        }

        if self.nats_token.as_deref() == Some("") {
            return Err("NATS token cannot be empty when provided".to_owned());
        }

        if self.nats_connect_timeout_secs == 0 || self.nats_request_timeout_secs == 0 {
            return Err("NATS timeouts must be at least one second".to_owned());
        }

        Ok(())
    }
}
