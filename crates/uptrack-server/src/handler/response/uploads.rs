//! Upload response types.

use serde::{Deserialize, Serialize};
use uptrack_core::progress::Progress;

/// An issued upload token with its current progress record.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTicket {
    /// Token to poll progress with.
    pub token: String,
    /// Progress recorded when the response was produced.
    pub progress: Progress,
}

impl UploadTicket {
    /// Creates a new ticket.
    pub fn new(token: impl Into<String>, progress: Progress) -> Self {
        Self {
            token: token.into(),
            progress,
        }
    }
}
