//! Error types, shared constants and a monotonic clock used across the dqutil crates.

pub mod constants;
pub mod error;
pub mod reltime;

pub use error::{DqError, DqResult};
pub use reltime::RelativeTime;
