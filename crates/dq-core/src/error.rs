//! Crate-wide error type.

use thiserror::Error;

/// Result type used throughout the dqutil crates.
pub type DqResult<T> = Result<T, DqError>;

/// Errors surfaced by the dqutil concurrency, codec, table and transport layers.
#[derive(Debug, Clone, Error)]
pub enum DqError {
    /// A caller-supplied argument was out of range or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A value buffer could not be decoded: unexpected tag, kind mismatch, or
    /// truncated payload.
    #[error("parse failure: {0}")]
    ParseFailure(String),

    /// The underlying transport (socket bind/connect/send) failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A blocking operation reached its deadline before its predicate held.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The operation was invoked after the owning component was stopped.
    #[error("stopped: {0}")]
    Stopped(String),

    /// An internal invariant was violated; this indicates a bug rather than
    /// caller misuse.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DqError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        DqError::InvalidArgument(msg.into())
    }

    pub fn parse_failure(msg: impl Into<String>) -> Self {
        DqError::ParseFailure(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        DqError::Transport(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        DqError::Timeout(msg.into())
    }

    pub fn stopped(msg: impl Into<String>) -> Self {
        DqError::Stopped(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        DqError::Internal(msg.into())
    }

    /// True for errors that represent a deadline expiring rather than a
    /// genuine failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DqError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_detail() {
        let e = DqError::invalid_argument("col_id out of range");
        assert_eq!(format!("{}", e), "invalid argument: col_id out of range");
    }

    #[test]
    fn is_timeout_only_matches_timeout_variant() {
        assert!(DqError::timeout("deadline reached").is_timeout());
        assert!(!DqError::internal("oops").is_timeout());
    }
}
