//! Turns layer failures and handler panics into JSON error bodies.

use std::any::Any;

use axum::response::{IntoResponse, Response};
use tower::BoxError;
use tower::timeout::error::Elapsed;

use super::TRACING_TARGET_MIDDLEWARE;
use crate::handler::Error;

/// Answers a failure raised by a layer below [`HandleErrorLayer`].
///
/// Timeouts become 503 so a polling client retries instead of giving up.
///
/// [`HandleErrorLayer`]: axum::error_handling::HandleErrorLayer
pub async fn handle_error(err: BoxError) -> Response {
    if err.is::<Elapsed>() {
        tracing::warn!(target: TRACING_TARGET_MIDDLEWARE, "Request deadline exceeded");
        return Error::unavailable("Request timeout").into_response();
    }

    tracing::error!(target: TRACING_TARGET_MIDDLEWARE, error = %err, "Unhandled layer error");
    Error::internal().with_detail(err).into_response()
}

/// Answers a handler panic with a bare 500.
pub fn catch_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let panic = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");

    tracing::error!(target: TRACING_TARGET_MIDDLEWARE, panic, "Handler panicked");
    Error::internal().into_response()
}
