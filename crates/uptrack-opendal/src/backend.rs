//! Building the OpenDAL operator uploads are written through.

use opendal::{Builder, Operator, services};

use crate::TRACING_TARGET;
use crate::config::{BackendType, StorageConfig};
use crate::error::{StorageError, StorageResult};

/// A configured OpenDAL operator together with the settings it came from.
#[derive(Clone)]
pub struct StorageBackend {
    operator: Operator,
    config: StorageConfig,
}

impl StorageBackend {
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        config.validate().map_err(StorageError::init)?;
        let operator = operator_for(&config)?;

        tracing::info!(
            target: TRACING_TARGET,
            backend = config.backend_name(),
            root = %config.root,
            bucket = ?config.bucket,
            "Storage backend ready"
        );

        Ok(Self { operator, config })
    }

    #[inline]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    #[inline]
    pub fn operator(&self) -> &Operator {
        &self.operator
    }
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBackend")
            .field("backend", &self.config.backend_name())
            .field("root", &self.config.root)
            .finish_non_exhaustive()
    }
}

fn finish(builder: impl Builder) -> StorageResult<Operator> {
    Ok(Operator::new(builder).map_err(StorageError::init)?.finish())
}

/// Backends whose cargo feature is off fall through to the last arm.
#[allow(unreachable_patterns)]
fn operator_for(config: &StorageConfig) -> StorageResult<Operator> {
    match config.backend_type {
        BackendType::Memory => finish(services::Memory::default().root(&config.root)),

        #[cfg(feature = "fs")]
        BackendType::Fs => finish(services::Fs::default().root(&config.root)),

        #[cfg(feature = "gcs")]
        BackendType::Gcs => {
            let mut gcs = services::Gcs::default().root(&config.root);
            if let Some(bucket) = &config.bucket {
                gcs = gcs.bucket(bucket);
            }
            if let Some(endpoint) = &config.endpoint {
                gcs = gcs.endpoint(endpoint);
            }
            if let Some(path) = &config.credential_path {
                gcs = gcs.credential_path(path);
            }
            finish(gcs)
        }

        #[cfg(feature = "s3")]
        BackendType::S3 => {
            let mut s3 = services::S3::default().root(&config.root);
            if let Some(bucket) = &config.bucket {
                s3 = s3.bucket(bucket);
            }
            if let Some(region) = &config.region {
                s3 = s3.region(region);
            }
            if let Some(endpoint) = &config.endpoint {
                s3 = s3.endpoint(endpoint);
            }
            if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
                s3 = s3.access_key_id(key_id).secret_access_key(secret);
            }
            finish(s3)
        }

        _ => Err(StorageError::init(format!(
            "the '{}' backend is not compiled in",
            config.backend_name()
        ))),
    }
}
