//! Local token store configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

// Default values
const DEFAULT_DELIMITER: char = ';';
const DEFAULT_EXPIRY_MS: u64 = 10_000;

/// Configuration for the in-process token store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct StoreConfig {
    /// Character joining namespace and name in a token identity
    #[cfg_attr(
        feature = "config",
        arg(long = "token-delimiter", env = "TOKEN_DELIMITER", default_value_t = DEFAULT_DELIMITER)
    )]
    pub token_delimiter: char,

    /// Expiry in milliseconds applied when a put does not specify one (0 = never)
    #[cfg_attr(
        feature = "config",
        arg(long = "token-expiry-ms", env = "TOKEN_EXPIRY_MS", default_value_t = DEFAULT_EXPIRY_MS)
    )]
    pub token_expiry_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            token_delimiter: DEFAULT_DELIMITER,
            token_expiry_ms: DEFAULT_EXPIRY_MS,
        }
    }
}

impl StoreConfig {
    /// Returns the default expiry as a Duration.
    #[inline]
    pub fn default_expiry(&self) -> Duration {
        Duration::from_millis(self.token_expiry_ms)
    }

    /// Set the identity delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.token_delimiter = delimiter;
        self
    }

    /// Set the default expiry.
    pub fn with_default_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry_ms = u64::try_from(expiry.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.token_delimiter.is_alphanumeric() || self.token_delimiter.is_whitespace() {
            return Err(format!(
                "Token delimiter '{}' must be a punctuation character",
                self.token_delimiter
            ));
        }

        Ok(())
    }
}
