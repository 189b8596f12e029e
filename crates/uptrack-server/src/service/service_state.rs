//! Application state and dependency injection.

use std::sync::Arc;

use uptrack_core::progress::{Progress, ProgressCache};
use uptrack_core::store::TokenStore;

use crate::service::{Result, ServiceConfig, TokenMinter, UploadTracker};

/// Tracing target for state initialization.
const TRACING_TARGET: &str = "uptrack_server::service::state";

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    token_store: Arc<dyn TokenStore<Progress>>,
    progress_cache: ProgressCache,
    upload_tracker: UploadTracker,
    token_minter: TokenMinter,
}

impl ServiceState {
    /// Initializes application state from configuration.
    ///
    /// Connects to the configured token store and opens the storage backend.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        let token_store = config.connect_token_store().await?;
        let progress_cache = config.create_progress_cache(token_store.clone());
        let upload_client = config.create_upload_client()?;

        let service_state = Self {
            upload_tracker: UploadTracker::new(progress_cache.clone(), upload_client),
            token_minter: config.create_token_minter()?,
            progress_cache,
            token_store,
        };

        tracing::info!(
            target: TRACING_TARGET,
            token_store = %config.token_store,
            storage = %config.storage.backend_name(),
            namespace = %config.progress_namespace,
            "Service state initialized"
        );

        Ok(service_state)
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(token_store: Arc<dyn TokenStore<Progress>>);
impl_di!(progress_cache: ProgressCache);
impl_di!(upload_tracker: UploadTracker);
impl_di!(token_minter: TokenMinter);
