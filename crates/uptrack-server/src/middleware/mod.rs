//! Middleware for `axum::Router` and HTTP request processing.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use axum::Router;
//! use uptrack_server::middleware::RouterExt;
//!
//! let app: Router = Router::new()
//!     .with_body_limit_layer(64 * 1024 * 1024)
//!     .with_error_handling_layer(Duration::from_secs(300))
//!     .with_observability_layer();
//! ```

mod error_handling;
mod extensions;
mod observability;

pub use extensions::{DEFAULT_MAX_BODY_SIZE, RouterExt};

/// Tracing target for middleware errors and panics.
pub const TRACING_TARGET_MIDDLEWARE: &str = "uptrack_server::middleware";
