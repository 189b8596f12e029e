//! Connection to the NATS server backing the remote token store.
//!
//! The underlying `async-nats` client multiplexes every operation over one
//! connection and is cheap to clone, so one [`NatsClient`] per process is
//! enough:
//!
//! ```ignore
//! let client = NatsClient::connect(config).await?;
//! let tokens = client.token_store::<Progress>(TokenStoreConfig::default()).await?;
//! ```

use std::sync::Arc;

use async_nats::{ConnectOptions, jetstream};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::timeout;

use super::nats_config::{CLIENT_NAME, NatsConfig};
use crate::kv::{KvStore, NatsTokenStore, TokenStoreConfig};
use crate::{Error, Result, TRACING_TARGET_CLIENT, TRACING_TARGET_CONNECTION};

/// Connected JetStream context. Cheaply cloneable.
#[derive(Debug, Clone)]
pub struct NatsClient {
    inner: Arc<NatsClientInner>,
}

#[derive(Debug)]
struct NatsClientInner {
    jetstream: jetstream::Context,
    config: NatsConfig,
}

impl NatsClient {
    /// Connects to the server named in `config`.
    ///
    /// Gives up with [`Error::Timeout`] if the server does not answer within
    /// the connect timeout.
    #[tracing::instrument(skip(config), target = TRACING_TARGET_CONNECTION)]
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        config.validate().map_err(Error::invalid_config)?;

        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            url = %config.nats_url,
            "Connecting to NATS"
        );

        let mut options = ConnectOptions::new()
            .name(CLIENT_NAME)
            .connection_timeout(config.connect_timeout());
        if let Some(token) = config.nats_token.clone() {
            options = options.token(token);
        }

        let connect_timeout = config.connect_timeout();
        let client = timeout(connect_timeout, options.connect(config.nats_url.trim()))
            .await
            .map_err(|_| Error::timeout(connect_timeout))?
            .map_err(|e| Error::Connection(Box::new(e)))?;

        let server_info = client.server_info();
        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            server_version = %server_info.version,
            server_id = %server_info.server_id,
            "Connected to NATS"
        );

        Ok(Self {
            inner: Arc::new(NatsClientInner {
                jetstream: jetstream::new(client),
                config,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &NatsConfig {
        &self.inner.config
    }

    /// Opens (or creates) the token bucket and wraps it in a [`NatsTokenStore`].
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn token_store<V>(&self, config: TokenStoreConfig) -> Result<NatsTokenStore<V>>
    where
        V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        config.validate().map_err(Error::invalid_config)?;
        let store = KvStore::open(
            &self.inner.jetstream,
            config.max_age(),
            self.inner.config.request_timeout(),
        )
        .await?;
        Ok(NatsTokenStore::new(store, config))
    }
}
