use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use uptrack_core::progress::{DEFAULT_PROGRESS_NAMESPACE, Progress, ProgressCache};
use uptrack_core::store::{LocalTokenStore, StoreConfig, TokenStore};
use uptrack_nats::kv::TokenStoreConfig;
use uptrack_nats::{NatsClient, NatsConfig};
use uptrack_opendal::{StorageConfig, UploadClient};

use crate::service::{Result, TokenAlgorithm, TokenMinter};

/// Tracing target for service configuration.
const TRACING_TARGET: &str = "uptrack_server::service::config";

/// Default values for configuration options.
mod defaults {
    /// Default progress record lifetime in seconds.
    pub const PROGRESS_EXPIRY_SECS: u64 = 60 * 60;
}

/// Token store implementation backing the progress cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::AsRefStr, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TokenStoreBackend {
    /// In-process map with timer eviction.
    #[default]
    Local,
    /// NATS JetStream key-value bucket.
    Nats,
}

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Token store backing the progress cache
    #[cfg_attr(
        feature = "config",
        arg(long = "token-store", env = "TOKEN_STORE", value_enum, default_value_t = TokenStoreBackend::Local)
    )]
    pub token_store: TokenStoreBackend,

    /// Namespace progress tokens are stored under
    #[cfg_attr(
        feature = "config",
        arg(long = "progress-namespace", env = "PROGRESS_NAMESPACE", default_value = DEFAULT_PROGRESS_NAMESPACE)
    )]
    pub progress_namespace: String,

    /// Lifetime of a progress record in seconds, fixed at its first write
    /// (0 = never, local store only)
    #[cfg_attr(
        feature = "config",
        arg(long = "progress-expiry-secs", env = "PROGRESS_EXPIRY_SECS", default_value_t = defaults::PROGRESS_EXPIRY_SECS)
    )]
    pub progress_expiry_secs: u64,

    /// Salt for tokens minted from file names (generated per process if unset)
    #[cfg_attr(
        feature = "config",
        arg(long = "token-salt", env = "TOKEN_SALT", hide_env_values = true)
    )]
    #[serde(skip_serializing)]
    pub token_salt: Option<String>,

    /// Digest used to mint tokens
    #[cfg_attr(
        feature = "config",
        arg(long = "token-algorithm", env = "TOKEN_ALGORITHM", value_enum, default_value_t = TokenAlgorithm::Sha512)
    )]
    pub token_algorithm: TokenAlgorithm,

    #[cfg_attr(feature = "config", command(flatten))]
    pub local_store: StoreConfig,

    #[cfg_attr(feature = "config", command(flatten))]
    pub nats: NatsConfig,

    #[cfg_attr(feature = "config", command(flatten))]
    pub nats_store: TokenStoreConfig,

    #[cfg_attr(feature = "config", command(flatten))]
    pub storage: StorageConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            token_store: TokenStoreBackend::Local,
            progress_namespace: DEFAULT_PROGRESS_NAMESPACE.to_string(),
            progress_expiry_secs: defaults::PROGRESS_EXPIRY_SECS,
            token_salt: None,
            token_algorithm: TokenAlgorithm::default(),
            local_store: StoreConfig::default(),
            nats: NatsConfig::default(),
            nats_store: TokenStoreConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Returns the progress record lifetime.
    #[inline]
    pub fn progress_expiry(&self) -> Duration {
        Duration::from_secs(self.progress_expiry_secs)
    }

    /// Builds the configured token store, connecting to NATS if selected.
    pub async fn connect_token_store(&self) -> Result<Arc<dyn TokenStore<Progress>>> {
        let store: Arc<dyn TokenStore<Progress>> = match self.token_store {
            TokenStoreBackend::Local => Arc::new(LocalTokenStore::new(self.local_store.clone())),
            TokenStoreBackend::Nats => {
                let client = NatsClient::connect(self.nats.clone()).await?;
                Arc::new(client.token_store::<Progress>(self.nats_store.clone()).await?)
            }
        };

        tracing::info!(
            target: TRACING_TARGET,
            backend = %self.token_store,
            delimiter = %store.delimiter(),
            "Token store ready"
        );

        Ok(store)
    }

    /// Wraps `store` in a progress cache with the configured namespace and expiry.
    pub fn create_progress_cache(&self, store: Arc<dyn TokenStore<Progress>>) -> ProgressCache {
        ProgressCache::new(store)
            .with_namespace(self.progress_namespace.clone())
            .with_expiry(self.progress_expiry())
    }

    /// Builds the object storage upload client.
    pub fn create_upload_client(&self) -> Result<UploadClient> {
        Ok(UploadClient::new(self.storage.clone())?)
    }

    /// Builds the token minter, generating a salt if none is configured.
    pub fn create_token_minter(&self) -> Result<TokenMinter> {
        TokenMinter::from_salt(self.token_salt.as_deref(), self.token_algorithm)
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.progress_namespace.is_empty() {
            return Err("Progress namespace cannot be empty".to_string());
        }

        if self.token_salt.as_deref() == Some("") {
            return Err("Token salt cannot be empty when provided".to_string());
        }

        let delimiter = match self.token_store {
            TokenStoreBackend::Local => {
                self.local_store.validate()?;
                self.local_store.token_delimiter
            }
            TokenStoreBackend::Nats => {
                self.nats.validate()?;
                self.nats_store.validate()?;
                self.nats_store
                    .check_expiry(self.progress_expiry())
                    .map_err(|e| format!("Invalid progress expiry: {e}"))?;
                self.nats_store.nats_token_delimiter
            }
        };

        if self.progress_namespace.contains(delimiter) {
            return Err(format!(
                "Progress namespace '{}' contains the token delimiter '{delimiter}'",
                self.progress_namespace
            ));
        }

        self.storage.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ServiceConfig::default();
        assert_eq!(config.token_store, TokenStoreBackend::Local);
        assert_eq!(config.progress_namespace, "progress");
        assert_eq!(config.progress_expiry(), Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn namespace_with_delimiter_is_rejected() {
        let config = ServiceConfig {
            progress_namespace: "a;b".to_string(),
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ServiceConfig {
            token_store: TokenStoreBackend::Nats,
            progress_namespace: "a;b".to_string(),
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nats_progress_expiry_must_fit_bucket_max_age() {
        let nats = |progress_expiry_secs| ServiceConfig {
            token_store: TokenStoreBackend::Nats,
            progress_expiry_secs,
            ..ServiceConfig::default()
        };

        assert!(nats(defaults::PROGRESS_EXPIRY_SECS).validate().is_ok());
        assert!(nats(0).validate().is_err());
        assert!(nats(2 * 24 * 60 * 60).validate().is_err());

        let local = ServiceConfig {
            progress_expiry_secs: 0,
            ..ServiceConfig::default()
        };
        assert!(local.validate().is_ok());
    }

    #[test]
    fn backend_names_parse() {
        assert_eq!("nats".parse::<TokenStoreBackend>().ok(), Some(TokenStoreBackend::Nats));
        assert_eq!(TokenStoreBackend::Local.as_ref(), "local");
    }

    #[tokio::test]
    async fn local_store_uses_configured_delimiter() -> anyhow::Result<()> {
        let config = ServiceConfig::default();
        let store = config.connect_token_store().await?;
        let cache = config.create_progress_cache(store);

        assert_eq!(cache.identity("tok")?, "progress;tok");
        Ok(())
    }
}
