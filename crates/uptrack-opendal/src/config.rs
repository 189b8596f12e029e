//! Storage configuration types.

#[cfg(feature = "config")]
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

/// Storage service an upload client writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::AsRefStr, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackendType {
    /// Process-local memory.
    #[default]
    Memory,
    /// Local filesystem.
    Fs,
    /// Google Cloud Storage.
    Gcs,
    /// Amazon S3 compatible storage.
    S3,
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct StorageConfig {
    /// Storage backend uploads are written to
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-backend", env = "STORAGE_BACKEND", value_enum, default_value_t = BackendType::Memory)
    )]
    pub backend_type: BackendType,

    /// Root directory or key prefix inside the backend
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-root", env = "STORAGE_ROOT", default_value = "/")
    )]
    pub root: String,

    /// Bucket name (gcs, s3)
    #[cfg_attr(feature = "config", arg(long = "storage-bucket", env = "STORAGE_BUCKET"))]
    pub bucket: Option<String>,

    /// Region (s3)
    #[cfg_attr(feature = "config", arg(long = "storage-region", env = "STORAGE_REGION"))]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible storage
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-endpoint", env = "STORAGE_ENDPOINT")
    )]
    pub endpoint: Option<String>,

    /// Access key ID (s3)
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-access-key-id", env = "STORAGE_ACCESS_KEY_ID")
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    /// Secret access key (s3)
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-secret-access-key", env = "STORAGE_SECRET_ACCESS_KEY", hide_env_values = true)
    )]
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,

    /// Path to a service account credential file (gcs)
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-credential-path", env = "STORAGE_CREDENTIAL_PATH")
    )]
    pub credential_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::memory()
    }
}

impl StorageConfig {
    /// Creates an in-memory configuration.
    pub fn memory() -> Self {
        Self {
            backend_type: BackendType::Memory,
            root: "/".to_string(),
            bucket: None,
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            credential_path: None,
        }
    }

    /// Creates a local filesystem configuration rooted at `root`.
    pub fn fs(root: impl Into<String>) -> Self {
        Self {
            backend_type: BackendType::Fs,
            root: root.into(),
            ..Self::memory()
        }
    }

    /// Creates an S3 configuration.
    pub fn s3(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            backend_type: BackendType::S3,
            bucket: Some(bucket.into()),
            region: Some(region.into()),
            ..Self::memory()
        }
    }

    /// Creates a Google Cloud Storage configuration.
    pub fn gcs(bucket: impl Into<String>) -> Self {
        Self {
            backend_type: BackendType::Gcs,
            bucket: Some(bucket.into()),
            ..Self::memory()
        }
    }

    /// Returns the backend name as a static string.
    pub fn backend_name(&self) -> &'static str {
        match self.backend_type {
            BackendType::Memory => "memory",
            BackendType::Fs => "fs",
            BackendType::Gcs => "gcs",
            BackendType::S3 => "s3",
        }
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.root.is_empty() {
            return Err("Storage root cannot be empty".to_string());
        }

        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err("Storage access key ID and secret must be set together".to_string());
        }

        match self.backend_type {
            BackendType::Gcs | BackendType::S3 if self.bucket.is_none() => Err(format!(
                "Storage backend '{}' requires a bucket",
                self.backend_name()
            )),
            BackendType::S3 if self.region.is_none() && self.endpoint.is_none() => {
                Err("Storage backend 's3' requires a region or an endpoint".to_string())
            }
            _ => Ok(()),
        }
    }
}
