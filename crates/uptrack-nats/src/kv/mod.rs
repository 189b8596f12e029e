//! The token bucket and the [`TokenStore`] built on it.
//!
//! [`KvStore`] is the typed view of a bucket named by a [`KvBucket`] and
//! keyed by a [`KvKey`]. [`NatsTokenStore`] layers expiry envelopes on top.
//!
//! [`TokenStore`]: uptrack_core::store::TokenStore

mod kv_bucket;
mod kv_key;
mod kv_store;
mod token_envelope;
mod token_store;

pub use kv_bucket::{KvBucket, TokensBucket};
pub use kv_key::{KvKey, TokenKey};
pub use kv_store::KvStore;
pub use token_envelope::TokenEnvelope;
pub use token_store::{NatsTokenStore, TokenStoreConfig};
