//! Progress cache over any token store.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::Progress;
use crate::store::{TokenId, TokenStore};
use crate::{Result, TRACING_TARGET_PROGRESS};

/// Namespace shared by all progress tokens unless overridden.
pub const DEFAULT_PROGRESS_NAMESPACE: &str = "progress";

/// Typed progress layer over one [`TokenStore`].
///
/// Every write overwrites the previous record. The record's expiry deadline
/// is fixed by the first write for a token; later writes never extend it.
/// Status is derived on write and derived again on read, so the caller of
/// [`set_progress`](Self::set_progress) sees exactly what a later poll sees.
///
/// Backend failures surface as `Err` and mean "unknown progress". They are
/// never reported as [`ProgressStatus::Error`], which is reserved for a
/// position past the end.
///
/// [`ProgressStatus::Error`]: super::ProgressStatus::Error
#[derive(Clone)]
pub struct ProgressCache {
    store: Arc<dyn TokenStore<Progress>>,
    namespace: Cow<'static, str>,
    expiry: Option<Duration>,
}

impl ProgressCache {
    /// Creates a cache over `store` using the default namespace and the
    /// store's default expiry.
    pub fn new(store: Arc<dyn TokenStore<Progress>>) -> Self {
        Self {
            store,
            namespace: Cow::Borrowed(DEFAULT_PROGRESS_NAMESPACE),
            expiry: None,
        }
    }

    /// Set the namespace all progress tokens are stored under.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<Cow<'static, str>>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the expiry armed when a token's first record is written.
    ///
    /// A zero duration keeps records until they are cleared.
    #[must_use]
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Returns the namespace.
    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the store identity of a progress token.
    pub fn identity(&self, token: &str) -> Result<String> {
        self.store.identity(token, Some(&self.namespace))
    }

    /// Records `(current, end)` for `token` and returns the persisted record.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_PROGRESS)]
    pub async fn set_progress(&self, token: &str, current: u64, end: u64) -> Result<Progress> {
        let progress = Progress::new(current, end);
        let entry = self
            .store
            .put(token, Some(&self.namespace), progress, self.expiry)
            .await?;

        tracing::debug!(
            target: TRACING_TARGET_PROGRESS,
            identity = %entry.identity,
            status = %progress.status,
            current_position = current,
            end_position = end,
            created = entry.created,
            "Progress updated"
        );

        Ok(progress)
    }

    /// Records an `IDLE` placeholder so a freshly issued token is pollable
    /// before any bytes move.
    pub async fn reserve(&self, token: &str) -> Result<Progress> {
        self.set_progress(token, 0, 0).await
    }

    /// Returns the current record for `token`, or `None` if there is none.
    ///
    /// "No record" is distinct from `IDLE`.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_PROGRESS)]
    pub async fn get_progress(&self, token: &str) -> Result<Option<Progress>> {
        let progress = self
            .store
            .get(token, Some(&self.namespace))
            .await?
            .map(Progress::rederive);

        if progress.is_none() {
            tracing::warn!(
                target: TRACING_TARGET_PROGRESS,
                token = %token,
                namespace = %self.namespace,
                "No progress recorded for token"
            );
        }

        Ok(progress)
    }

    /// Removes the record for `token`. Returns whether one was removed.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_PROGRESS)]
    pub async fn clear_progress(&self, token: &str) -> Result<bool> {
        let delimiter = self.store.delimiter();
        let Ok(id) = TokenId::new(token, Some(&self.namespace), delimiter) else {
            return Ok(false);
        };

        self.store.force_expire(&id.to_identity(delimiter)).await
    }
}

impl fmt::Debug for ProgressCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressCache")
            .field("namespace", &self.namespace)
            .field("expiry", &self.expiry)
            .field("delimiter", &self.store.delimiter())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressStatus;
    use crate::store::{LocalTokenStore, StoreConfig};

    fn cache() -> (LocalTokenStore<Progress>, ProgressCache) {
        let store = LocalTokenStore::new(StoreConfig::default());
        let cache = ProgressCache::new(Arc::new(store.clone()));
        (store, cache)
    }

    #[tokio::test]
    async fn status_follows_positions() -> anyhow::Result<()> {
        let (_, cache) = cache();

        let progress = cache.set_progress("tok1", 0, 100).await?;
        assert_eq!(progress.status, ProgressStatus::Progress);

        let progress = cache.set_progress("tok1", 100, 100).await?;
        assert_eq!(progress.status, ProgressStatus::Done);

        let progress = cache.set_progress("tok1", 150, 100).await?;
        assert_eq!(progress.status, ProgressStatus::Error);

        let polled = cache.get_progress("tok1").await?;
        assert_eq!(polled, Some(progress));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_token_is_none() -> anyhow::Result<()> {
        let (_, cache) = cache();
        assert_eq!(cache.get_progress("unknown-token").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() -> anyhow::Result<()> {
        let (_, cache) = cache();
        cache.set_progress("tok", 42, 100).await?;

        let first = cache.get_progress("tok").await?;
        let second = cache.get_progress("tok").await?;
        assert_eq!(first, second);
        assert_eq!(first, Some(Progress::new(42, 100)));
        Ok(())
    }

    #[tokio::test]
    async fn reserve_is_idle_not_missing() -> anyhow::Result<()> {
        let (_, cache) = cache();

        let reserved = cache.reserve("tok").await?;
        assert_eq!(reserved.status, ProgressStatus::Idle);
        assert_eq!(
            cache.get_progress("tok").await?.map(|p| p.status),
            Some(ProgressStatus::Idle)
        );
        Ok(())
    }

    #[tokio::test]
    async fn records_live_in_the_progress_namespace() -> anyhow::Result<()> {
        let (store, cache) = cache();
        cache.set_progress("tok", 1, 2).await?;

        assert_eq!(cache.identity("tok")?, "progress;tok");
        assert!(store.has("tok", Some("progress")).await?);
        assert!(!store.has("tok", None).await?);
        Ok(())
    }

    #[tokio::test]
    async fn clear_removes_the_record() -> anyhow::Result<()> {
        let (_, cache) = cache();
        cache.set_progress("tok", 1, 2).await?;

        assert!(cache.clear_progress("tok").await?);
        assert_eq!(cache.get_progress("tok").await?, None);
        assert!(!cache.clear_progress("tok").await?);
        assert!(!cache.clear_progress("bad;token").await?);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn first_write_fixes_the_deadline() -> anyhow::Result<()> {
        let (store, cache) = cache();
        let cache = cache.with_expiry(Duration::from_secs(2));

        cache.set_progress("tok", 0, 100).await?;
        for position in [25, 50, 75] {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cache.set_progress("tok", position, 100).await?;
        }
        assert_eq!(store.stats().await.armed_timers, 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(cache.get_progress("tok").await?, None);
        Ok(())
    }
}
