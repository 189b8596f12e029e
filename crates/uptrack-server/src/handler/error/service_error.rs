//! Service error to HTTP error conversion.

use super::http_error::Error;

/// Tracing target for service error conversions.
const TRACING_TARGET: &str = "uptrack_server::handler::service";

impl From<crate::Error> for Error {
    fn from(error: crate::Error) -> Self {
        if error.is_external() {
            tracing::warn!(target: TRACING_TARGET, error = %error, "Backing service failed");
            return Error::unavailable("A backing service did not answer").with_detail(&error);
        }

        tracing::error!(target: TRACING_TARGET, error = %error, "Service operation failed");
        Error::internal().with_detail(&error)
    }
}

#[cfg(test)]
mod tests {
    use super::super::ErrorKind;
    use super::*;

    #[test]
    fn external_failures_are_unavailable() {
        let storage = crate::Error::from(uptrack_opendal::StorageError::write("disk full"));
        let error = Error::from(storage);
        assert_eq!(error.kind(), ErrorKind::Unavailable);
        assert!(error.detail().is_some_and(|d| d.contains("disk full")));

        let minting = Error::from(crate::Error::minting("argon2 failed"));
        assert_eq!(minting.kind(), ErrorKind::Internal);
        assert_eq!(minting.message(), "Internal server error.");
    }
}
