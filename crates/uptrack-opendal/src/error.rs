//! Failures of the object storage layer.

use std::io;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The configured backend cannot be built.
    #[error("storage backend unavailable: {0}")]
    Init(String),

    #[error("no such file or object: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    PermissionDenied(String),

    /// The local source file could not be read.
    #[error("reading the source failed: {0}")]
    Read(String),

    /// The backend rejected a chunk.
    #[error("writing the object failed: {0}")]
    Write(String),

    /// The destination is not a usable object key.
    #[error("invalid object key: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Backend(opendal::Error),
}

impl StorageError {
    pub fn init(reason: impl ToString) -> Self {
        Self::Init(reason.to_string())
    }

    pub fn read(reason: impl ToString) -> Self {
        Self::Read(reason.to_string())
    }

    pub fn write(reason: impl ToString) -> Self {
        Self::Write(reason.to_string())
    }

    pub fn invalid_path(reason: impl ToString) -> Self {
        Self::InvalidPath(reason.to_string())
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            opendal::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::Backend(err),
        }
    }
}

/// Local file errors; anything but a missing or forbidden file is a read failure.
impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::read(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_classified() {
        let missing = StorageError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(missing, StorageError::NotFound(_)));

        let denied = StorageError::from(io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert!(matches!(denied, StorageError::PermissionDenied(_)));

        let other = StorageError::from(io::Error::other("is a directory"));
        assert!(matches!(other, StorageError::Read(reason) if reason == "is a directory"));
    }

    #[test]
    fn backend_errors_keep_their_message() {
        let err = opendal::Error::new(opendal::ErrorKind::Unexpected, "throttled");
        let err = StorageError::from(err);
        assert!(matches!(err, StorageError::Backend(_)));
        assert!(err.to_string().contains("throttled"));
    }
}
