//! Upload progress tracking on top of a [`TokenStore`].
//!
//! [`TokenStore`]: crate::store::TokenStore

mod progress_cache;
mod progress_record;
mod progress_status;

pub use self::progress_cache::{DEFAULT_PROGRESS_NAMESPACE, ProgressCache};
pub use self::progress_record::Progress;
pub use self::progress_status::ProgressStatus;
