//! Failures talking to NATS and how the token store reports them.

use std::time::Duration;

/// Result type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The client could not connect or lost its connection.
    #[error("NATS connection failed: {0}")]
    Connection(#[from] async_nats::Error),

    /// A stored value could not be encoded or decoded.
    #[error("stored value is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The server did not answer within the configured bound.
    #[error("NATS did not answer within {0:?}")]
    Timeout(Duration),

    #[error("invalid NATS configuration: {0}")]
    InvalidConfig(String),

    /// The server answered with an error.
    #[error("KV {operation} failed: {details}")]
    Operation {
        operation: &'static str,
        details: String,
    },
}

impl Error {
    pub fn operation(operation: &'static str, details: impl Into<String>) -> Self {
        Self::Operation {
            operation,
            details: details.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    pub fn timeout(after: Duration) -> Self {
        Self::Timeout(after)
    }

    fn core_kind(&self) -> uptrack_core::ErrorKind {
        use uptrack_core::ErrorKind;

        match self {
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Connection(_) | Self::Operation { .. } => ErrorKind::Unavailable,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::InvalidConfig(_) => ErrorKind::Internal,
        }
    }
}

/// Unreachable or slow servers become "unavailable" so callers never mistake
/// them for a missing token.
impl From<Error> for uptrack_core::Error {
    fn from(err: Error) -> Self {
        uptrack_core::Error::new(err.core_kind())
            .with_message(err.to_string())
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use uptrack_core::ErrorKind;

    use super::*;

    #[test]
    fn timeout_maps_to_core_timeout() {
        let err: uptrack_core::Error = Error::timeout(Duration::from_secs(5)).into();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_unavailable());
    }

    #[test]
    fn operation_maps_to_unavailable() {
        let err: uptrack_core::Error = Error::operation("get", "no responders").into();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.to_string().contains("no responders"));
    }

    #[test]
    fn serialization_is_not_unavailable() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: uptrack_core::Error = Error::from(json_err).into();
        assert_eq!(err.kind(), ErrorKind::Serialization);
        assert!(!err.is_unavailable());
    }
}
