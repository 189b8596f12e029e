//! Application state and dependency injection.

mod service_config;
mod service_state;
mod token_minter;
mod upload_tracker;

pub use crate::service::service_config::{ServiceConfig, TokenStoreBackend};
pub use crate::service::service_state::ServiceState;
pub use crate::service::token_minter::{
    DEFAULT_SALT_BYTES, TokenAlgorithm, TokenMinter, obscure, shake_salt, validate,
};
pub use crate::service::upload_tracker::UploadTracker;
pub use crate::{Error as ServiceError, Result};
