//! Stored representation of a token value.

use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// A token value together with the deadline armed when it was created.
///
/// Overwrites copy `expires_at` forward unchanged, so readers can enforce the
/// original deadline even after the server-side TTL was reset by a plain put.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEnvelope<V> {
    pub value: V,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

impl<V> TokenEnvelope<V> {
    /// Wraps a freshly created value expiring `expiry` after `now`.
    pub fn created(value: V, expiry: Option<Duration>, now: Timestamp) -> Self {
        let expires_at = expiry
            .and_then(|e| SignedDuration::try_from(e).ok())
            .and_then(|e| now.checked_add(e).ok());

        Self { value, expires_at }
    }

    /// Wraps an overwrite, keeping the deadline of `previous`.
    pub fn overwrite(value: V, previous: &Self) -> Self {
        Self {
            value,
            expires_at: previous.expires_at,
        }
    }

    /// Returns true once the deadline has passed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }

    /// Returns the remaining lifetime, `None` if the envelope never expires.
    pub fn remaining(&self, now: Timestamp) -> Option<Duration> {
        let deadline = self.expires_at?;
        Some(Duration::try_from(now.duration_until(deadline)).unwrap_or(Duration::ZERO))
    }
}
