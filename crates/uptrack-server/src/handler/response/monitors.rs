//! Monitor response types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// System health status response.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    /// Whether the token store answered a full round trip.
    pub is_healthy: bool,
    /// Timestamp when this status was generated.
    pub checked_at: Timestamp,
    /// Application version.
    pub version: String,
}

impl MonitorStatus {
    /// Creates a status stamped with the current time.
    pub fn new(is_healthy: bool) -> Self {
        Self {
            is_healthy,
            checked_at: Timestamp::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
