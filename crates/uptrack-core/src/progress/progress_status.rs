//! Status derived from a progress position pair.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Lifecycle status of a tracked operation.
///
/// Never stored on its own: always derived from `(current, end)` with
/// [`ProgressStatus::derive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ProgressStatus {
    /// Nothing to transfer yet (`end == 0`).
    Idle,
    /// Transfer under way (`current < end`).
    Progress,
    /// Transfer complete (`current == end`).
    Done,
    /// Position ran past the end (`current > end`).
    Error,
}

impl ProgressStatus {
    /// Derives the status of a `(current, end)` pair.
    pub fn derive(current: u64, end: u64) -> Self {
        if end == 0 {
            return Self::Idle;
        }

        match current.cmp(&end) {
            Ordering::Less => Self::Progress,
            Ordering::Equal => Self::Done,
            Ordering::Greater => Self::Error,
        }
    }
}
