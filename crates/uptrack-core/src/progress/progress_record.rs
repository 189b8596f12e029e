//! Progress record stored per token.

use serde::{Deserialize, Serialize};

use super::ProgressStatus;

/// A `(current_position, end_position)` pair with its derived status.
///
/// Serialized as
/// `{"status":"PROGRESS","current_position":10,"end_position":100}`.
/// The `status` field is informational on the wire; readers re-derive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Status derived from the positions.
    pub status: ProgressStatus,
    /// Bytes (or units) processed so far.
    pub current_position: u64,
    /// Total bytes (or units) expected.
    pub end_position: u64,
}

impl Progress {
    /// Creates a record, deriving its status.
    pub fn new(current_position: u64, end_position: u64) -> Self {
        Self {
            status: ProgressStatus::derive(current_position, end_position),
            current_position,
            end_position,
        }
    }

    /// Creates an `IDLE` record with nothing to transfer.
    pub fn idle() -> Self {
        Self::new(0, 0)
    }

    /// Returns the same positions with the status derived again.
    #[must_use]
    pub fn rederive(self) -> Self {
        Self::new(self.current_position, self.end_position)
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        let json = serde_json::to_value(Progress::new(10, 100)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "PROGRESS",
                "current_position": 10,
                "end_position": 100,
            })
        );
    }

    #[test]
    fn rederive_ignores_stored_status() {
        let tampered: Progress = serde_json::from_str(
            r#"{"status":"IDLE","current_position":100,"end_position":100}"#,
        )
        .unwrap();
        assert_eq!(tampered.rederive().status, ProgressStatus::Done);
    }
}
