//! File uploads with byte-level progress.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;

use crate::TRACING_TARGET;
use crate::backend::StorageBackend;
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};

const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Destination key inside the backend.
    pub key: String,
    /// Total bytes written, equal to the source file size.
    pub bytes_written: u64,
}

/// Streams local files into a [`StorageBackend`].
#[derive(Debug, Clone)]
pub struct UploadClient {
    backend: StorageBackend,
    chunk_size: usize,
}

impl UploadClient {
    /// Creates a client over a new backend built from `config`.
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        Ok(Self::from_backend(StorageBackend::new(config)?))
    }

    /// Creates a client over an existing backend.
    pub fn from_backend(backend: StorageBackend) -> Self {
        Self {
            backend,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the size of each read and write. Clamped to at least one byte.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Returns the backend uploads are written to.
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// Copies `local_path` to `destination_key`.
    ///
    /// `on_progress` receives the running total after every chunk. Values
    /// never decrease. The last one equals the file size and is reported only
    /// once the object has been committed; an empty file reports `0` once.
    #[tracing::instrument(skip(self, on_progress), target = TRACING_TARGET)]
    pub async fn upload<F>(
        &self,
        local_path: &Path,
        destination_key: &str,
        mut on_progress: F,
    ) -> StorageResult<UploadReceipt>
    where
        F: FnMut(u64) + Send,
    {
        if destination_key.is_empty() || destination_key.ends_with('/') {
            return Err(StorageError::invalid_path(format!(
                "'{destination_key}' is not an object key"
            )));
        }

        let mut file = tokio::fs::File::open(local_path).await?;
        let mut writer = self.backend.operator().writer(destination_key).await?;
        let mut buffer = vec![0_u8; self.chunk_size];
        let mut bytes_written = 0_u64;
        let mut unreported = None;

        loop {
            let read = match file.read(&mut buffer).await {
                Ok(read) => read,
                Err(err) => {
                    abort_writer(&mut writer, destination_key).await;
                    return Err(StorageError::read(err.to_string()));
                }
            };
            if read == 0 {
                break;
            }

            if let Err(err) = writer.write(buffer[..read].to_vec()).await {
                abort_writer(&mut writer, destination_key).await;
                return Err(StorageError::write(err.to_string()));
            }

            // The newest total waits until the next chunk is written, so the
            // file size is never reported before the commit below.
            if let Some(total) = unreported.replace(bytes_written + read as u64) {
                on_progress(total);
            }
            bytes_written += read as u64;
        }

        writer.close().await?;
        on_progress(bytes_written);

        tracing::info!(
            target: TRACING_TARGET,
            key = %destination_key,
            bytes_written = bytes_written,
            "Upload complete"
        );

        Ok(UploadReceipt {
            key: destination_key.to_owned(),
            bytes_written,
        })
    }
}

async fn abort_writer(writer: &mut opendal::Writer, key: &str) {
    if let Err(err) = writer.abort().await {
        tracing::warn!(
            target: TRACING_TARGET,
            key = %key,
            error = %err,
            "Failed to abort partial upload"
        );
    }
}
