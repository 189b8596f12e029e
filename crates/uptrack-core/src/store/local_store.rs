//! In-process token store with timer-driven eviction.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

use super::{StoreConfig, TokenEntry, TokenId, TokenStore};
use crate::{Result, TRACING_TARGET_STORE};

/// In-memory [`TokenStore`] backed by a nested map.
///
/// Namespaced tokens live in `namespace -> name -> slot`, unnamespaced tokens
/// in a flat map. A single store-wide mutex serializes every
/// check-insert-arm sequence, so concurrent puts of one new identity arm
/// exactly one timer.
///
/// Eviction is a one-shot task per entry. Each slot carries a generation; a
/// timer only removes the slot it was armed for, so a timer racing a forced
/// expiry and re-creation of the same identity is a no-op.
///
/// Cloning is cheap and clones share the same entries.
pub struct LocalTokenStore<V> {
    inner: Arc<LocalStoreInner<V>>,
}

struct LocalStoreInner<V> {
    config: StoreConfig,
    state: Mutex<LocalState<V>>,
}

struct LocalState<V> {
    flat: HashMap<String, Slot<V>>,
    namespaced: HashMap<String, HashMap<String, Slot<V>>>,
    next_generation: u64,
    evictions: u64,
}

struct Slot<V> {
    value: V,
    generation: u64,
    expiry: Option<Duration>,
    timer: Option<AbortHandle>,
}

/// Point-in-time counters of a [`LocalTokenStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStoreStats {
    /// Live entries across all namespaces.
    pub entries: usize,
    /// Namespace containers, including empty ones.
    pub namespaces: usize,
    /// Expiry timers that have not fired yet.
    pub armed_timers: usize,
    /// Entries removed by their expiry timer.
    pub evictions: u64,
}

impl<V> LocalTokenStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty store.
    pub fn new(config: StoreConfig) -> Self {
        tracing::debug!(
            target: TRACING_TARGET_STORE,
            delimiter = %config.token_delimiter,
            default_expiry_ms = config.token_expiry_ms,
            "Created local token store"
        );

        Self {
            inner: Arc::new(LocalStoreInner {
                config,
                state: Mutex::new(LocalState::default()),
            }),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Returns current entry and timer counters.
    pub async fn stats(&self) -> TokenStoreStats {
        let state = self.inner.state.lock().await;
        let slots = state.all_slots();

        TokenStoreStats {
            entries: state.flat.len()
                + state.namespaced.values().map(HashMap::len).sum::<usize>(),
            namespaces: state.namespaced.len(),
            armed_timers: slots
                .filter(|slot| slot.timer.as_ref().is_some_and(|t| !t.is_finished()))
                .count(),
            evictions: state.evictions,
        }
    }

    fn arm_timer(&self, id: TokenId, generation: u64, expiry: Duration) -> AbortHandle {
        let inner: Weak<LocalStoreInner<V>> = Arc::downgrade(&self.inner);

        let task = tokio::spawn(async move {
            tokio::time::sleep(expiry).await;
            if let Some(inner) = inner.upgrade() {
                inner.evict(&id, generation).await;
            }
        });

        task.abort_handle()
    }
}

impl<V> LocalStoreInner<V> {
    async fn evict(&self, id: &TokenId, generation: u64) {
        let delimiter = self.config.token_delimiter;
        let mut state = self.state.lock().await;

        if state.slot(id).map(|slot| slot.generation) != Some(generation) {
            tracing::debug!(
                target: TRACING_TARGET_STORE,
                identity = %id.display(delimiter),
                generation = generation,
                "Ignoring stale expiry timer"
            );
            return;
        }

        state.remove(id);
        state.evictions += 1;

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            identity = %id.display(delimiter),
            "Token expired"
        );
    }
}

impl<V> LocalState<V> {
    fn slot(&self, id: &TokenId) -> Option<&Slot<V>> {
        match id.namespace() {
            Some(ns) => self.namespaced.get(ns)?.get(id.name()),
            None => self.flat.get(id.name()),
        }
    }

    fn slot_mut(&mut self, id: &TokenId) -> Option<&mut Slot<V>> {
        match id.namespace() {
            Some(ns) => self.namespaced.get_mut(ns)?.get_mut(id.name()),
            None => self.flat.get_mut(id.name()),
        }
    }

    fn insert(&mut self, id: &TokenId, slot: Slot<V>) {
        let slots = match id.namespace() {
            Some(ns) => self.namespaced.entry(ns.to_owned()).or_default(),
            None => &mut self.flat,
        };

        slots.insert(id.name().to_owned(), slot);
    }

    /// Removes the leaf only; namespace containers are kept for reuse.
    fn remove(&mut self, id: &TokenId) -> Option<Slot<V>> {
        match id.namespace() {
            Some(ns) => self.namespaced.get_mut(ns)?.remove(id.name()),
            None => self.flat.remove(id.name()),
        }
    }

    fn all_slots(&self) -> impl Iterator<Item = &Slot<V>> {
        self.flat
            .values()
            .chain(self.namespaced.values().flat_map(HashMap::values))
    }
}

impl<V> Default for LocalState<V> {
    fn default() -> Self {
        Self {
            flat: HashMap::new(),
            namespaced: HashMap::new(),
            next_generation: 0,
            evictions: 0,
        }
    }
}

impl<V> Drop for LocalStoreInner<V> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for timer in state.all_slots().filter_map(|slot| slot.timer.as_ref()) {
            timer.abort();
        }
    }
}

#[async_trait]
impl<V> TokenStore<V> for LocalTokenStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    #[inline]
    fn delimiter(&self) -> char {
        self.inner.config.token_delimiter
    }

    #[tracing::instrument(skip(self, value), target = TRACING_TARGET_STORE)]
    async fn put(
        &self,
        name: &str,
        namespace: Option<&str>,
        value: V,
        expiry: Option<Duration>,
    ) -> Result<TokenEntry> {
        let delimiter = self.delimiter();
        let id = TokenId::new(name, namespace, delimiter)?;
        let identity = id.to_identity(delimiter);

        let mut state = self.inner.state.lock().await;

        if let Some(slot) = state.slot_mut(&id) {
            slot.value = value;

            tracing::debug!(
                target: TRACING_TARGET_STORE,
                identity = %identity,
                generation = slot.generation,
                "Overwrote token, expiry unchanged"
            );

            return Ok(TokenEntry {
                identity,
                expiry: slot.expiry,
                created: false,
            });
        }

        let expiry = expiry.unwrap_or_else(|| self.inner.config.default_expiry());
        state.next_generation += 1;
        let generation = state.next_generation;

        let (expiry, timer) = if expiry.is_zero() {
            tracing::warn!(
                target: TRACING_TARGET_STORE,
                identity = %identity,
                "Token has no expiry and will not expire"
            );
            (None, None)
        } else {
            let timer = self.arm_timer(id.clone(), generation, expiry);
            (Some(expiry), Some(timer))
        };

        state.insert(
            &id,
            Slot {
                value,
                generation,
                expiry,
                timer,
            },
        );

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            identity = %identity,
            generation = generation,
            expiry_ms = expiry.map(|e| e.as_millis() as u64),
            "Created token"
        );

        Ok(TokenEntry {
            identity,
            expiry,
            created: true,
        })
    }

    async fn has(&self, name: &str, namespace: Option<&str>) -> Result<bool> {
        let id = TokenId::new(name, namespace, self.delimiter())?;
        let state = self.inner.state.lock().await;
        Ok(state.slot(&id).is_some())
    }

    async fn get(&self, name: &str, namespace: Option<&str>) -> Result<Option<V>> {
        let id = TokenId::new(name, namespace, self.delimiter())?;
        let state = self.inner.state.lock().await;
        Ok(state.slot(&id).map(|slot| slot.value.clone()))
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET_STORE)]
    async fn force_expire(&self, identity: &str) -> Result<bool> {
        let Some(id) = TokenId::parse(identity, self.delimiter()) else {
            tracing::warn!(
                target: TRACING_TARGET_STORE,
                identity = %identity,
                "Cannot expire malformed token identity"
            );
            return Ok(false);
        };

        let mut state = self.inner.state.lock().await;
        let Some(slot) = state.remove(&id) else {
            tracing::debug!(
                target: TRACING_TARGET_STORE,
                identity = %identity,
                "Token already gone"
            );
            return Ok(false);
        };

        if let Some(timer) = slot.timer {
            timer.abort();
        }

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            identity = %identity,
            "Force expired token"
        );
        Ok(true)
    }
}

impl<V> Clone for LocalTokenStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for LocalTokenStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTokenStore")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn store(expiry_ms: u64) -> LocalTokenStore<String> {
        let config = StoreConfig::default().with_default_expiry(Duration::from_millis(expiry_ms));
        LocalTokenStore::new(config)
    }

    #[tokio::test]
    async fn put_then_get() -> anyhow::Result<()> {
        let store = store(10_000);

        let entry = store.put("tok1", Some("ns"), "v1".to_owned(), None).await?;
        assert_eq!(entry.identity, "ns;tok1");
        assert_eq!(entry.expiry, Some(Duration::from_secs(10)));
        assert!(entry.created);

        assert!(store.has("tok1", Some("ns")).await?);
        assert_eq!(store.get("tok1", Some("ns")).await?, Some("v1".to_owned()));
        assert_eq!(store.get("tok1", None).await?, None);

        let flat = store.put("tok2", None, "v2".to_owned(), None).await?;
        assert_eq!(flat.identity, "tok2");
        assert_eq!(store.get("tok2", None).await?, Some("v2".to_owned()));
        Ok(())
    }

    #[tokio::test]
    async fn namespaces_are_isolated() -> anyhow::Result<()> {
        let store = store(10_000);

        store.put("x", Some("a"), "v1".to_owned(), None).await?;
        store.put("x", Some("b"), "v2".to_owned(), None).await?;

        assert_eq!(store.get("x", Some("a")).await?, Some("v1".to_owned()));
        assert_eq!(store.get("x", Some("b")).await?, Some("v2".to_owned()));
        assert_eq!(store.stats().await.entries, 2);
        Ok(())
    }

    #[tokio::test]
    async fn overwrite_keeps_original_expiry() -> anyhow::Result<()> {
        let store = store(10_000);

        let five = Some(Duration::from_secs(5));
        let sixty = Some(Duration::from_secs(60));
        store.put("tok", None, "v1".to_owned(), five).await?;
        let entry = store.put("tok", None, "v2".to_owned(), sixty).await?;

        assert!(!entry.created);
        assert_eq!(entry.expiry, Some(Duration::from_secs(5)));
        assert_eq!(store.get("tok", None).await?, Some("v2".to_owned()));
        Ok(())
    }

    #[tokio::test]
    async fn force_expire_removes_only_the_leaf() -> anyhow::Result<()> {
        let store = store(10_000);

        store.put("a", Some("ns"), "va".to_owned(), None).await?;
        store.put("b", Some("ns"), "vb".to_owned(), None).await?;

        assert!(store.force_expire("ns;a").await?);
        assert!(!store.has("a", Some("ns")).await?);
        assert_eq!(store.get("b", Some("ns")).await?, Some("vb".to_owned()));

        assert!(!store.force_expire("ns;a").await?);

        assert!(store.force_expire("ns;b").await?);
        let stats = store.stats().await;
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.namespaces, 1);
        assert_eq!(stats.armed_timers, 0);
        Ok(())
    }

    #[tokio::test]
    async fn force_expire_malformed_identity() -> anyhow::Result<()> {
        let store = store(10_000);
        store.put("a", Some("ns"), "va".to_owned(), None).await?;

        assert!(!store.force_expire("ns;a;extra").await?);
        assert!(!store.force_expire("").await?);
        assert!(!store.force_expire(";a").await?);
        assert!(store.has("a", Some("ns")).await?);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_tokens_are_rejected() {
        let store = store(10_000);

        let err = store.put("a;b", None, "v".to_owned(), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);

        let err = store.put("", Some("ns"), "v".to_owned(), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_at_deadline() -> anyhow::Result<()> {
        let store = store(1_000);
        store.put("tok", Some("ns"), "v".to_owned(), None).await?;

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(store.has("tok", Some("ns")).await?);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!store.has("tok", Some("ns")).await?);

        let stats = store.stats().await;
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.armed_timers, 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn overwrites_do_not_postpone_eviction() -> anyhow::Result<()> {
        let store = store(10_000);
        let expiry = Some(Duration::from_secs(1));

        store.put("tok", Some("ns"), "v1".to_owned(), expiry).await?;
        tokio::time::sleep(Duration::from_millis(600)).await;

        store.put("tok", Some("ns"), "v2".to_owned(), expiry).await?;
        assert_eq!(store.stats().await.armed_timers, 1);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.get("tok", Some("ns")).await?, None);
        assert_eq!(store.stats().await.evictions, 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn zero_expiry_never_expires() -> anyhow::Result<()> {
        let store = store(10_000);

        let entry = store
            .put("tok", None, "v".to_owned(), Some(Duration::ZERO))
            .await?;
        assert_eq!(entry.expiry, None);
        assert_eq!(store.stats().await.armed_timers, 0);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(store.has("tok", None).await?);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_does_not_evict_recreated_entry() -> anyhow::Result<()> {
        let store = store(1_000);

        store.put("tok", Some("ns"), "old".to_owned(), None).await?;
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(store.force_expire("ns;tok").await?);
        store.put("tok", Some("ns"), "new".to_owned(), None).await?;

        // Past the first entry's deadline.
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(store.get("tok", Some("ns")).await?, Some("new".to_owned()));

        // Past the second entry's deadline.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.get("tok", Some("ns")).await?, None);
        assert_eq!(store.stats().await.evictions, 1);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_puts_arm_one_timer() -> anyhow::Result<()> {
        let store = store(60_000);

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .put("tok", Some("ns"), format!("v{i}"), None)
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await??.created {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        let stats = store.stats().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.armed_timers, 1);
        Ok(())
    }
}
