#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for token store operations.
///
/// Use this target for logging entry creation, overwrites, timer arming and eviction.
pub const TRACING_TARGET_STORE: &str = "uptrack_core::store";

/// Tracing target for progress cache operations.
pub const TRACING_TARGET_PROGRESS: &str = "uptrack_core::progress";

mod error;

pub mod progress;
pub mod store;

pub use error::{Error, ErrorKind, Result};
