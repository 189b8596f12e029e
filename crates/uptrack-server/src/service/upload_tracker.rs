//! Background uploads that report into the progress cache.

use std::path::Path;

use tempfile::TempPath;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uptrack_core::progress::ProgressCache;
use uptrack_opendal::{UploadClient, UploadReceipt};

/// Tracing target for background uploads.
const TRACING_TARGET: &str = "uptrack_server::service::upload_tracker";

/// Runs uploads in the background and mirrors their byte progress.
///
/// The upload client's callback only publishes the latest byte count on a
/// watch channel. A separate task writes it to the cache, so a burst of
/// callbacks collapses into at most one pending cache write.
#[derive(Debug, Clone)]
pub struct UploadTracker {
    progress: ProgressCache,
    client: UploadClient,
}

impl UploadTracker {
    /// Creates a tracker writing into `progress`.
    pub fn new(progress: ProgressCache, client: UploadClient) -> Self {
        Self { progress, client }
    }

    /// Returns the progress cache.
    #[inline]
    pub fn progress(&self) -> &ProgressCache {
        &self.progress
    }

    /// Uploads the spooled file at `source` to `key` in a background task.
    ///
    /// The spool file is removed when the task finishes. On failure the
    /// token's record is cleared, so pollers see it as unknown.
    pub fn spawn(
        &self,
        token: String,
        source: TempPath,
        key: String,
        size: u64,
    ) -> JoinHandle<Option<UploadReceipt>> {
        let tracker = self.clone();
        tokio::spawn(async move { tracker.run(&token, &source, &key, size).await })
    }

    async fn run(&self, token: &str, source: &Path, key: &str, size: u64) -> Option<UploadReceipt> {
        let (tx, mut rx) = watch::channel(0_u64);

        let progress = self.progress.clone();
        let forward_token = token.to_owned();
        let forwarder = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let written = *rx.borrow_and_update();
                if let Err(err) = progress.set_progress(&forward_token, written, size).await {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        token = %forward_token,
                        error = %err,
                        "Failed to record upload progress"
                    );
                }
            }
        });

        let result = {
            let tx = tx;
            self.client
                .upload(source, key, |written| {
                    tx.send_replace(written);
                })
                .await
        };

        if let Err(err) = forwarder.await {
            tracing::error!(
                target: TRACING_TARGET,
                token = %token,
                error = %err,
                "Progress forwarder stopped unexpectedly"
            );
        }

        match result {
            Ok(receipt) => {
                tracing::info!(
                    target: TRACING_TARGET,
                    token = %token,
                    key = %receipt.key,
                    bytes_written = receipt.bytes_written,
                    "Upload finished"
                );
                Some(receipt)
            }
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    token = %token,
                    key = %key,
                    error = %err,
                    "Upload failed"
                );
                if let Err(err) = self.progress.clear_progress(token).await {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        token = %token,
                        error = %err,
                        "Failed to clear progress of failed upload"
                    );
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use tempfile::NamedTempFile;
    use uptrack_core::progress::{Progress, ProgressStatus};
    use uptrack_core::store::{LocalTokenStore, StoreConfig};
    use uptrack_opendal::StorageConfig;

    use super::*;

    fn tracker_with_client() -> anyhow::Result<(UploadTracker, UploadClient)> {
        let store = LocalTokenStore::<Progress>::new(StoreConfig::default());
        let progress = ProgressCache::new(Arc::new(store));
        let client = UploadClient::new(StorageConfig::memory())?.with_chunk_size(1024);
        Ok((UploadTracker::new(progress, client.clone()), client))
    }

    fn tracker() -> anyhow::Result<UploadTracker> {
        Ok(tracker_with_client()?.0)
    }

    #[tokio::test]
    async fn upload_ends_done() -> anyhow::Result<()> {
        let (tracker, client) = tracker_with_client()?;
        let mut file = NamedTempFile::new()?;
        file.write_all(&[7_u8; 5000])?;
        let path = file.into_temp_path();

        tracker.progress().set_progress("tok", 0, 5000).await?;
        let receipt = tracker
            .spawn("tok".to_string(), path, "data.bin".to_string(), 5000)
            .await?;

        assert_eq!(receipt.map(|r| r.bytes_written), Some(5000));
        let progress = tracker.progress().get_progress("tok").await?;
        assert_eq!(progress.map(|p| p.status), Some(ProgressStatus::Done));
        assert_eq!(client.backend().operator().stat("data.bin").await?.content_length(), 5000);
        Ok(())
    }

    #[tokio::test]
    async fn spool_file_is_removed() -> anyhow::Result<()> {
        let tracker = tracker()?;
        let file = NamedTempFile::new()?;
        let path = file.into_temp_path();
        let location = path.to_path_buf();

        tracker
            .spawn("tok".to_string(), path, "empty".to_string(), 0)
            .await?;
        assert!(!location.exists());
        Ok(())
    }

    #[tokio::test]
    async fn failed_upload_clears_progress() -> anyhow::Result<()> {
        let tracker = tracker()?;
        let file = NamedTempFile::new()?;
        let path = file.into_temp_path();

        tracker.progress().set_progress("tok", 0, 10).await?;
        let receipt = tracker
            .spawn("tok".to_string(), path, "dir/".to_string(), 10)
            .await?;

        assert!(receipt.is_none());
        assert_eq!(tracker.progress().get_progress("tok").await?, None);
        Ok(())
    }
}
