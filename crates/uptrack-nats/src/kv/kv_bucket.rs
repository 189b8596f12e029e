//! Key-value bucket configuration traits.

/// Marker trait for KV bucket configuration.
pub trait KvBucket: Clone + Send + Sync + 'static {
    /// Bucket name used in NATS KV.
    const NAME: &'static str;

    /// Human-readable description for the bucket.
    const DESCRIPTION: &'static str;
}

/// Bucket holding expiring tokens.
///
/// Per-key TTLs do the real expiry. The bucket `max_age`, set from
/// [`TokenStoreConfig`](super::TokenStoreConfig), only sweeps entries that were
/// overwritten and then abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokensBucket;

impl KvBucket for TokensBucket {
    const NAME: &'static str = "tokens";
    const DESCRIPTION: &'static str = "Expiring tokens";
}
