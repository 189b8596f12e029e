#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Bucket setup and token store construction.
pub const TRACING_TARGET_CLIENT: &str = "uptrack_nats::client";

/// Individual bucket reads and writes.
pub const TRACING_TARGET_KV: &str = "uptrack_nats::kv";

pub const TRACING_TARGET_CONNECTION: &str = "uptrack_nats::connection";

mod client;
mod error;
pub mod kv;

pub use client::{NatsClient, NatsConfig};
pub use error::{Error, Result};
