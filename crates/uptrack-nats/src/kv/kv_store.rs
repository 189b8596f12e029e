//! Typed access to one JetStream KV bucket.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use async_nats::jetstream::{self, kv};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{KvBucket, KvKey};
use crate::{Error, Result, TRACING_TARGET_KV};

/// JSON values of type `V` under keys of type `K` in bucket `B`.
///
/// Each call is one round trip bounded by the request timeout, so a stalled
/// server surfaces as [`Error::Timeout`] instead of a hung request.
pub struct KvStore<K, V, B> {
    store: kv::Store,
    request_timeout: Duration,
    _types: PhantomData<fn() -> (K, V, B)>,
}

impl<K, V, B> KvStore<K, V, B>
where
    K: KvKey,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    B: KvBucket,
{
    /// Binds to bucket `B`, creating it when missing.
    ///
    /// A created bucket keeps one revision per key, allows per-key TTLs and
    /// drops anything older than `max_age`.
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_KV)]
    pub(crate) async fn open(
        jetstream: &jetstream::Context,
        max_age: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let lookup = tokio::time::timeout(request_timeout, jetstream.get_key_value(B::NAME))
            .await
            .map_err(|_| Error::timeout(request_timeout))?;

        let store = match lookup {
            Ok(store) => store,
            Err(_) => {
                tracing::info!(
                    target: TRACING_TARGET_KV,
                    bucket = B::NAME,
                    max_age_secs = max_age.as_secs(),
                    "Creating KV bucket"
                );

                let config = kv::Config {
                    bucket: B::NAME.to_owned(),
                    description: B::DESCRIPTION.to_owned(),
                    history: 1,
                    max_age,
                    limit_markers: Some(max_age.max(Duration::from_secs(1))),
                    ..Default::default()
                };
                tokio::time::timeout(request_timeout, jetstream.create_key_value(config))
                    .await
                    .map_err(|_| Error::timeout(request_timeout))?
                    .map_err(|e| Error::operation("create bucket", e.to_string()))?
            }
        };

        Ok(Self {
            store,
            request_timeout,
            _types: PhantomData,
        })
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        B::NAME
    }

    /// Awaits `call` within the request timeout, leaving its own error as is.
    async fn within<T>(&self, call: impl Future<Output = T>) -> Result<T> {
        tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| Error::timeout(self.request_timeout))
    }

    /// Writes `key` unless it already exists. Returns whether it was written.
    ///
    /// With a `ttl` the server deletes the key once it elapses.
    #[tracing::instrument(skip(self, value), fields(key = %key), target = TRACING_TARGET_KV)]
    pub async fn create(&self, key: &K, value: &V, ttl: Option<Duration>) -> Result<bool> {
        let key = key.to_string();
        let payload = serde_json::to_vec(value)?.into();

        let outcome = match ttl {
            Some(ttl) => self.within(self.store.create_with_ttl(&key, payload, ttl)).await?,
            None => self.within(self.store.create(&key, payload)).await?,
        };

        match outcome {
            Ok(revision) => {
                tracing::debug!(target: TRACING_TARGET_KV, revision, "Key created");
                Ok(true)
            }
            Err(e) if e.kind() == kv::CreateErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(Error::operation("create", e.to_string())),
        }
    }

    /// Overwrites `key`. The key keeps whatever TTL it was created with.
    #[tracing::instrument(skip(self, value), fields(key = %key), target = TRACING_TARGET_KV)]
    pub async fn put(&self, key: &K, value: &V) -> Result<()> {
        let payload = serde_json::to_vec(value)?.into();
        let revision = self
            .within(self.store.put(key.to_string(), payload))
            .await?
            .map_err(|e| Error::operation("put", e.to_string()))?;

        tracing::debug!(target: TRACING_TARGET_KV, revision, "Key overwritten");
        Ok(())
    }

    /// Reads `key`. Deleted and purged keys read as `None`.
    #[tracing::instrument(skip(self), fields(key = %key), target = TRACING_TARGET_KV)]
    pub async fn get(&self, key: &K) -> Result<Option<V>> {
        let entry = self
            .within(self.store.entry(key.to_string()))
            .await?
            .map_err(|e| Error::operation("get", e.to_string()))?;

        match entry {
            Some(entry) if matches!(entry.operation, kv::Operation::Put) => {
                Ok(Some(serde_json::from_slice(&entry.value)?))
            }
            _ => Ok(None),
        }
    }

    /// Removes `key` and its history.
    #[tracing::instrument(skip(self), fields(key = %key), target = TRACING_TARGET_KV)]
    pub async fn purge(&self, key: &K) -> Result<()> {
        self.within(self.store.purge(key.to_string()))
            .await?
            .map_err(|e| Error::operation("purge", e.to_string()))
    }
}

impl<K, V, B> Clone for KvStore<K, V, B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            request_timeout: self.request_timeout,
            _types: PhantomData,
        }
    }
}

impl<K, V, B: KvBucket> fmt::Debug for KvStore<K, V, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvStore")
            .field("bucket", &B::NAME)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
