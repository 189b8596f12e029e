//! Failures of token store and progress operations.
//!
//! A missing token is never an error: stores report it as `Ok(None)` or
//! `Ok(false)`.

use std::error::Error as StdError;

use strum::IntoStaticStr;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What went wrong, independent of the backend that reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Name or namespace cannot form an identity.
    InvalidToken,
    /// The backing store refused or could not be reached.
    Unavailable,
    /// The backing store did not answer in time.
    Timeout,
    /// A stored value did not encode or decode.
    Serialization,
    Internal,
}

#[derive(Debug, thiserror::Error)]
#[error("{}{}", self.kind_str(), message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    pub fn invalid_token() -> Self {
        Self::new(ErrorKind::InvalidToken)
    }

    pub fn unavailable() -> Self {
        Self::new(ErrorKind::Unavailable)
    }

    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout)
    }

    pub fn serialization() -> Self {
        Self::new(ErrorKind::Serialization)
    }

    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Snake-case name of the kind, for log fields.
    #[inline]
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Whether the store could not answer at all.
    ///
    /// Callers must treat this as "unknown", never as a stored state.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.kind, ErrorKind::Unavailable | ErrorKind::Timeout)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization()
            .with_message(err.to_string())
            .with_source(err)
    }
}
