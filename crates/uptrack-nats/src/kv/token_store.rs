//! [`TokenStore`] over a NATS KV bucket.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "config")]
use clap::Args;
use jiff::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uptrack_core::store::{TokenEntry, TokenId, TokenStore};

use super::{KvStore, TokenEnvelope, TokenKey, TokensBucket};
use crate::TRACING_TARGET_KV;

// Default values
const DEFAULT_DELIMITER: char = ':';
const DEFAULT_EXPIRY_MS: u64 = 10_000;
const DEFAULT_MAX_AGE_SECS: u64 = 24 * 60 * 60;

/// Create/overwrite rounds before giving up on a key that keeps flapping.
const MAX_PUT_ATTEMPTS: usize = 3;

/// Configuration for the NATS-backed token store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct TokenStoreConfig {
    /// Character joining namespace and name in a token identity
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-token-delimiter", env = "NATS_TOKEN_DELIMITER", default_value_t = DEFAULT_DELIMITER)
    )]
    pub nats_token_delimiter: char,

    /// Expiry in milliseconds applied when a put does not specify one
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-token-expiry-ms", env = "NATS_TOKEN_EXPIRY_MS", default_value_t = DEFAULT_EXPIRY_MS)
    )]
    pub nats_token_expiry_ms: u64,

    /// Bucket max age in seconds, a sweep for entries that lost their per-key TTL
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-token-max-age-secs", env = "NATS_TOKEN_MAX_AGE_SECS", default_value_t = DEFAULT_MAX_AGE_SECS)
    )]
    pub nats_token_max_age_secs: u64,
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        Self {
            nats_token_delimiter: DEFAULT_DELIMITER,
            nats_token_expiry_ms: DEFAULT_EXPIRY_MS,
            nats_token_max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }
}

impl TokenStoreConfig {
    /// Returns the default expiry as a Duration.
    #[inline]
    pub fn default_expiry(&self) -> Duration {
        Duration::from_millis(self.nats_token_expiry_ms)
    }

    /// Returns the bucket max age as a Duration.
    #[inline]
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.nats_token_max_age_secs)
    }

    /// Set the identity delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.nats_token_delimiter = delimiter;
        self
    }

    /// Set the default expiry.
    pub fn with_default_expiry(mut self, expiry: Duration) -> Self {
        self.nats_token_expiry_ms = u64::try_from(expiry.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the bucket max age.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.nats_token_max_age_secs = max_age.as_secs();
        self
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), String> {
        let delimiter = self.nats_token_delimiter;
        if delimiter.is_alphanumeric() || delimiter.is_whitespace() {
            return Err(format!(
                "Token delimiter '{delimiter}' must be a punctuation character"
            ));
        }

        if self.nats_token_max_age_secs == 0 {
            return Err("Token bucket max age must be at least one second".to_string());
        }

        self.check_expiry(self.default_expiry())
    }

    /// Checks that tokens written with `expiry` can actually live that long.
    ///
    /// The bucket `max_age` purges every entry once it elapses, so neither an
    /// unbounded (zero) expiry nor one longer than `max_age` can be honored.
    pub fn check_expiry(&self, expiry: Duration) -> Result<(), String> {
        if expiry.is_zero() {
            return Err(format!(
                "Tokens cannot be kept forever; the bucket max age {:?} purges them",
                self.max_age()
            ));
        }

        if expiry > self.max_age() {
            return Err(format!(
                "Token expiry {expiry:?} exceeds the bucket max age {:?}",
                self.max_age()
            ));
        }

        Ok(())
    }
}

/// Bucket operations the token store is built on.
#[async_trait]
pub(crate) trait EnvelopeBucket<V>: Send + Sync {
    /// Writes `envelope` only if `key` is absent. Returns false if it exists.
    async fn create(
        &self,
        key: &TokenKey,
        envelope: &TokenEnvelope<V>,
        ttl: Option<Duration>,
    ) -> crate::Result<bool>;

    async fn put(&self, key: &TokenKey, envelope: &TokenEnvelope<V>) -> crate::Result<()>;

    async fn get(&self, key: &TokenKey) -> crate::Result<Option<TokenEnvelope<V>>>;

    async fn purge(&self, key: &TokenKey) -> crate::Result<()>;

    fn name(&self) -> &'static str;
}

#[async_trait]
impl<V> EnvelopeBucket<V> for KvStore<TokenKey, TokenEnvelope<V>, TokensBucket>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn create(
        &self,
        key: &TokenKey,
        envelope: &TokenEnvelope<V>,
        ttl: Option<Duration>,
    ) -> crate::Result<bool> {
        KvStore::create(self, key, envelope, ttl).await
    }

    async fn put(&self, key: &TokenKey, envelope: &TokenEnvelope<V>) -> crate::Result<()> {
        KvStore::put(self, key, envelope).await
    }

    async fn get(&self, key: &TokenKey) -> crate::Result<Option<TokenEnvelope<V>>> {
        KvStore::get(self, key).await
    }

    async fn purge(&self, key: &TokenKey) -> crate::Result<()> {
        KvStore::purge(self, key).await
    }

    fn name(&self) -> &'static str {
        KvStore::name(self)
    }
}

/// [`TokenStore`] backed by a JetStream KV bucket.
///
/// A new identity is written with an atomic create carrying a per-key TTL,
/// so the server expires it and exactly one concurrent writer creates it.
/// Overwrites are plain puts that copy the first deadline forward in the
/// [`TokenEnvelope`]; reads purge and hide envelopes past that deadline.
pub struct NatsTokenStore<V> {
    bucket: Arc<dyn EnvelopeBucket<V>>,
    config: TokenStoreConfig,
}

impl<V> NatsTokenStore<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub(crate) fn new(
        store: KvStore<TokenKey, TokenEnvelope<V>, TokensBucket>,
        config: TokenStoreConfig,
    ) -> Self {
        Self::with_bucket(Arc::new(store), config)
    }
}

impl<V> NatsTokenStore<V> {
    pub(crate) fn with_bucket(bucket: Arc<dyn EnvelopeBucket<V>>, config: TokenStoreConfig) -> Self {
        tracing::debug!(
            target: TRACING_TARGET_KV,
            bucket = %bucket.name(),
            delimiter = %config.nats_token_delimiter,
            default_expiry_ms = config.nats_token_expiry_ms,
            "Created NATS token store"
        );

        Self { bucket, config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &TokenStoreConfig {
        &self.config
    }

    fn key(&self, name: &str, namespace: Option<&str>) -> uptrack_core::Result<TokenKey> {
        let id = TokenId::new(name, namespace, self.config.nats_token_delimiter)?;
        Ok(TokenKey::from(&id))
    }

    /// Reads an envelope, purging it if its deadline has passed.
    async fn live_envelope(
        &self,
        key: &TokenKey,
    ) -> uptrack_core::Result<Option<TokenEnvelope<V>>> {
        let Some(envelope) = self.bucket.get(key).await? else {
            return Ok(None);
        };

        if envelope.is_expired(Timestamp::now()) {
            tracing::debug!(
                target: TRACING_TARGET_KV,
                key = %key,
                "Purging token past its deadline"
            );
            self.bucket.purge(key).await?;
            return Ok(None);
        }

        Ok(Some(envelope))
    }
}

#[async_trait]
impl<V> TokenStore<V> for NatsTokenStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    #[inline]
    fn delimiter(&self) -> char {
        self.config.nats_token_delimiter
    }

    #[tracing::instrument(skip(self, value), target = TRACING_TARGET_KV)]
    async fn put(
        &self,
        name: &str,
        namespace: Option<&str>,
        value: V,
        expiry: Option<Duration>,
    ) -> uptrack_core::Result<TokenEntry> {
        let identity = self.identity(name, namespace)?;
        let key = self.key(name, namespace)?;

        let expiry = expiry.unwrap_or_else(|| self.config.default_expiry());
        let expiry = if expiry.is_zero() {
            tracing::warn!(
                target: TRACING_TARGET_KV,
                identity = %identity,
                max_age_secs = self.config.nats_token_max_age_secs,
                "Token has no expiry; the bucket max age will still purge it"
            );
            None
        } else {
            Some(expiry)
        };

        for _ in 0..MAX_PUT_ATTEMPTS {
            let now = Timestamp::now();
            let envelope = TokenEnvelope::created(value.clone(), expiry, now);

            if self.bucket.create(&key, &envelope, expiry).await? {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    identity = %identity,
                    expiry_ms = expiry.map(|e| e.as_millis() as u64),
                    "Created token"
                );

                return Ok(TokenEntry {
                    identity,
                    expiry,
                    created: true,
                });
            }

            // Someone else created it; overwrite and keep their deadline.
            let Some(previous) = self.live_envelope(&key).await? else {
                continue;
            };

            let envelope = TokenEnvelope::overwrite(value.clone(), &previous);
            self.bucket.put(&key, &envelope).await?;

            tracing::debug!(
                target: TRACING_TARGET_KV,
                identity = %identity,
                "Overwrote token, expiry unchanged"
            );

            return Ok(TokenEntry {
                identity,
                expiry: previous.remaining(now),
                created: false,
            });
        }

        Err(uptrack_core::Error::unavailable().with_message(format!(
            "token '{identity}' changed on every attempt to write it"
        )))
    }

    async fn has(&self, name: &str, namespace: Option<&str>) -> uptrack_core::Result<bool> {
        let key = self.key(name, namespace)?;
        Ok(self.live_envelope(&key).await?.is_some())
    }

    async fn get(&self, name: &str, namespace: Option<&str>) -> uptrack_core::Result<Option<V>> {
        let key = self.key(name, namespace)?;
        Ok(self.live_envelope(&key).await?.map(|envelope| envelope.value))
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    async fn force_expire(&self, identity: &str) -> uptrack_core::Result<bool> {
        let Some(id) = TokenId::parse(identity, self.delimiter()) else {
            tracing::warn!(
                target: TRACING_TARGET_KV,
                identity = %identity,
                "Cannot expire malformed token identity"
            );
            return Ok(false);
        };

        // A token past its deadline is purged here and counts as already gone.
        let key = TokenKey::from(&id);
        if self.live_envelope(&key).await?.is_none() {
            tracing::debug!(
                target: TRACING_TARGET_KV,
                identity = %identity,
                "Token already gone"
            );
            return Ok(false);
        }

        self.bucket.purge(&key).await?;
        tracing::debug!(
            target: TRACING_TARGET_KV,
            identity = %identity,
            "Force expired token"
        );
        Ok(true)
    }
}

impl<V> Clone for NatsTokenStore<V> {
    fn clone(&self) -> Self {
        Self {
            bucket: Arc::clone(&self.bucket),
            config: self.config.clone(),
        }
    }
}

impl<V> fmt::Debug for NatsTokenStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NatsTokenStore")
            .field("bucket", &self.bucket.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use jiff::SignedDuration;
    use tokio::sync::Mutex;

    use super::*;

    /// Bucket kept in memory. Create-if-absent is atomic under the lock, like
    /// the server's, and server-side TTLs are left to the envelope deadline.
    struct MemoryBucket<V> {
        entries: Mutex<HashMap<String, TokenEnvelope<V>>>,
    }

    impl<V> MemoryBucket<V> {
        fn new() -> Self {
            Self {
                entries: Mutex::new(HashMap::new()),
            }
        }

        async fn insert(&self, key: &TokenKey, envelope: TokenEnvelope<V>) {
            self.entries.lock().await.insert(key.to_string(), envelope);
        }

        async fn raw(&self, key: &TokenKey) -> Option<TokenEnvelope<V>>
        where
            V: Clone,
        {
            self.entries.lock().await.get(&key.to_string()).cloned()
        }
    }

    #[async_trait]
    impl<V: Clone + Send + Sync + 'static> EnvelopeBucket<V> for MemoryBucket<V> {
        async fn create(
            &self,
            key: &TokenKey,
            envelope: &TokenEnvelope<V>,
            _ttl: Option<Duration>,
        ) -> crate::Result<bool> {
            let mut entries = self.entries.lock().await;
            if entries.contains_key(&key.to_string()) {
                return Ok(false);
            }
            entries.insert(key.to_string(), envelope.clone());
            Ok(true)
        }

        async fn put(&self, key: &TokenKey, envelope: &TokenEnvelope<V>) -> crate::Result<()> {
            self.insert(key, envelope.clone()).await;
            Ok(())
        }

        async fn get(&self, key: &TokenKey) -> crate::Result<Option<TokenEnvelope<V>>> {
            Ok(self.raw(key).await)
        }

        async fn purge(&self, key: &TokenKey) -> crate::Result<()> {
            self.entries.lock().await.remove(&key.to_string());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "memory"
        }
    }

    fn memory_store() -> (Arc<MemoryBucket<u64>>, NatsTokenStore<u64>) {
        let bucket = Arc::new(MemoryBucket::new());
        let store = NatsTokenStore::with_bucket(bucket.clone(), TokenStoreConfig::default());
        (bucket, store)
    }

    fn key(name: &str, namespace: Option<&str>) -> TokenKey {
        TokenKey::from(&TokenId::new(name, namespace, ':').unwrap())
    }

    #[test]
    fn test_default_config() {
        let config = TokenStoreConfig::default();
        assert_eq!(config.nats_token_delimiter, ':');
        assert_eq!(config.default_expiry(), Duration::from_secs(10));
        assert_eq!(config.max_age(), Duration::from_secs(24 * 60 * 60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(TokenStoreConfig::default().with_delimiter('x').validate().is_err());
        assert!(TokenStoreConfig::default().with_delimiter(' ').validate().is_err());
        assert!(
            TokenStoreConfig::default()
                .with_max_age(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            TokenStoreConfig::default()
                .with_max_age(Duration::from_secs(5))
                .validate()
                .is_err()
        );
        assert!(
            TokenStoreConfig::default()
                .with_default_expiry(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_expiry_is_bounded_by_max_age() {
        let config = TokenStoreConfig::default().with_max_age(Duration::from_secs(60));
        assert!(config.check_expiry(Duration::from_secs(60)).is_ok());
        assert!(config.check_expiry(Duration::from_secs(61)).is_err());
        assert!(config.check_expiry(Duration::ZERO).is_err());
    }

    #[tokio::test]
    async fn test_overwrite_keeps_first_deadline() -> anyhow::Result<()> {
        let (bucket, store) = memory_store();

        let first = store.put("tok", Some("progress"), 1, Some(Duration::from_secs(60))).await?;
        assert!(first.created);
        let deadline = bucket.raw(&key("tok", Some("progress"))).await.and_then(|e| e.expires_at);

        let second = store.put("tok", Some("progress"), 2, Some(Duration::from_secs(600))).await?;
        assert!(!second.created);
        assert!(second.expiry.is_some_and(|e| e <= Duration::from_secs(60)));

        let stored = bucket.raw(&key("tok", Some("progress"))).await;
        assert_eq!(stored.as_ref().map(|e| e.value), Some(2));
        assert_eq!(stored.and_then(|e| e.expires_at), deadline);
        Ok(())
    }

    #[tokio::test]
    async fn test_reads_hide_and_purge_past_deadline() -> anyhow::Result<()> {
        let (bucket, store) = memory_store();
        let key = key("tok", None);
        let past = Timestamp::now().checked_sub(SignedDuration::from_secs(5))?;
        bucket
            .insert(&key, TokenEnvelope::created(7, Some(Duration::from_secs(1)), past))
            .await;

        assert_eq!(store.get("tok", None).await?, None);
        assert!(bucket.raw(&key).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_force_expire_agrees_with_has() -> anyhow::Result<()> {
        let (bucket, store) = memory_store();
        let key = key("tok", Some("progress"));
        let past = Timestamp::now().checked_sub(SignedDuration::from_secs(5))?;
        bucket
            .insert(&key, TokenEnvelope::created(7, Some(Duration::from_secs(1)), past))
            .await;

        assert!(!store.force_expire("progress:tok").await?);
        assert!(!store.has("tok", Some("progress")).await?);

        store.put("tok", Some("progress"), 8, None).await?;
        assert!(store.has("tok", Some("progress")).await?);
        assert!(store.force_expire("progress:tok").await?);
        assert!(!store.force_expire("progress:tok").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_entry_is_recreated_with_new_deadline() -> anyhow::Result<()> {
        let (bucket, store) = memory_store();
        let key = key("tok", None);
        let past = Timestamp::now().checked_sub(SignedDuration::from_secs(5))?;
        bucket
            .insert(&key, TokenEnvelope::created(7, Some(Duration::from_secs(1)), past))
            .await;

        let entry = store.put("tok", None, 8, Some(Duration::from_secs(30))).await?;
        assert!(entry.created);
        assert_eq!(store.get("tok", None).await?, Some(8));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_create_once() -> anyhow::Result<()> {
        let (_, store) = memory_store();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put("race", Some("ns"), i, None).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await??.created {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert!(store.has("race", Some("ns")).await?);
        Ok(())
    }
}
