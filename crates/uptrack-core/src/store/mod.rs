//! Token stores: namespaced values with a single expiry per entry.
//!
//! Every store conforms to [`TokenStore`]. The concrete variant is chosen at
//! construction time and handed around as `Arc<dyn TokenStore<V>>`.
//!
//! # Expiry
//!
//! An entry's deadline is fixed when it is first created. Writing to an
//! existing identity replaces the value and leaves the deadline untouched, so
//! a burst of overwrites can never postpone eviction.

mod local_store;
mod store_config;
mod token_id;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use self::local_store::{LocalTokenStore, TokenStoreStats};
pub use self::store_config::StoreConfig;
pub use self::token_id::TokenId;
use crate::Result;

/// Outcome of a [`TokenStore::put`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    /// External identity, `namespace + delimiter + name` or just `name`.
    pub identity: String,
    /// Expiry armed when the entry was created, `None` if it never expires.
    pub expiry: Option<Duration>,
    /// Whether this call created the entry (and armed its expiry).
    pub created: bool,
}

/// Key-value container keyed by `(namespace?, name)` with per-entry expiry.
///
/// Not-found is a normal outcome: [`get`](Self::get) returns `Ok(None)` and
/// [`force_expire`](Self::force_expire) returns `Ok(false)`. Errors are reserved
/// for invalid tokens and for backends that cannot answer.
#[async_trait]
pub trait TokenStore<V>: Send + Sync
where
    V: Send + 'static,
{
    /// Returns the delimiter used to join namespace and name.
    fn delimiter(&self) -> char;

    /// Stores `value` under the identity built from `namespace` and `name`.
    ///
    /// `expiry` falls back to the store default when `None`. A zero expiry
    /// disables eviction for the entry. Expiry is only armed when the call
    /// creates the entry.
    async fn put(
        &self,
        name: &str,
        namespace: Option<&str>,
        value: V,
        expiry: Option<Duration>,
    ) -> Result<TokenEntry>;

    /// Returns true if a live entry exists.
    async fn has(&self, name: &str, namespace: Option<&str>) -> Result<bool>;

    /// Returns the stored value, or `None` if absent.
    async fn get(&self, name: &str, namespace: Option<&str>) -> Result<Option<V>>;

    /// Removes the entry named by `identity` immediately.
    ///
    /// Returns whether anything was removed. A malformed identity removes
    /// nothing. Only the leaf is removed; the namespace stays usable.
    async fn force_expire(&self, identity: &str) -> Result<bool>;

    /// Builds the external identity of a token for this store.
    fn identity(&self, name: &str, namespace: Option<&str>) -> Result<String> {
        let delimiter = self.delimiter();
        Ok(TokenId::new(name, namespace, delimiter)?.to_identity(delimiter))
    }
}
