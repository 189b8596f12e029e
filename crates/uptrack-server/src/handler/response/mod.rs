//! Response types for HTTP handlers.

mod errors;
mod monitors;
mod uploads;

pub use errors::*;
pub use monitors::*;
pub use uploads::*;
