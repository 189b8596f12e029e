//! Errors raised while wiring and running the upload service.

use std::borrow::Cow;

/// Result type for service operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures of the service layer, before they are mapped to HTTP answers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration cannot produce a working service.
    #[error("invalid configuration: {0}")]
    Config(Cow<'static, str>),

    /// The remote token store could not be reached.
    #[error("token store: {0}")]
    TokenStore(#[from] uptrack_nats::Error),

    /// The object storage backend failed.
    #[error("object storage: {0}")]
    Storage(#[from] uptrack_opendal::StorageError),

    /// A token could not be derived from a file name.
    #[error("token minting failed: {0}")]
    Minting(String),
}

impl Error {
    pub fn config(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Config(reason.into())
    }

    pub fn minting(reason: impl ToString) -> Self {
        Self::Minting(reason.to_string())
    }

    /// Returns true if a backing service failed rather than this process.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::TokenStore(_) | Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backing_services_are_external() {
        let nats = Error::from(uptrack_nats::Error::timeout(std::time::Duration::from_secs(1)));
        assert!(nats.is_external());
        assert!(nats.to_string().starts_with("token store:"));

        let storage = Error::from(uptrack_opendal::StorageError::write("disk full"));
        assert!(storage.is_external());

        assert!(!Error::config("Token salt cannot be empty").is_external());
        assert!(!Error::minting("argon2 failed").is_external());
    }
}
