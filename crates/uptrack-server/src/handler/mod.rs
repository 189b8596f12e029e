//! HTTP routes: uploads, progress lookups and the health check.

mod error;
mod monitors;
mod response;
mod uploads;

use axum::Router;
use axum::response::IntoResponse;

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::response::{ErrorResponse, MonitorStatus, UploadTicket};
use crate::service::ServiceState;

/// Every route, with unmatched paths answered by a JSON `not_found` body.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .merge(uploads::routes())
        .merge(monitors::routes())
        .fallback(|| async { ErrorKind::NotFound.into_response() })
}
