//! Token store error to HTTP error conversion.

use uptrack_core::ErrorKind as StoreErrorKind;

use super::http_error::Error;

/// Tracing target for token store error conversions.
const TRACING_TARGET: &str = "uptrack_server::handler::core";

impl From<uptrack_core::Error> for Error {
    fn from(error: uptrack_core::Error) -> Self {
        if error.is_unavailable() {
            tracing::warn!(
                target: TRACING_TARGET,
                error = %error,
                error_kind = %error.kind_str(),
                "Token store unavailable"
            );
            return Error::unavailable("Progress is unknown while the token store is unavailable")
                .with_detail(&error);
        }

        if error.kind() == StoreErrorKind::InvalidToken {
            return Error::bad_request("Invalid token")
                .with_resource("token")
                .with_detail(&error);
        }

        tracing::error!(
            target: TRACING_TARGET,
            error = %error,
            error_kind = %error.kind_str(),
            "Token store failed"
        );
        Error::internal().with_detail(&error)
    }
}
