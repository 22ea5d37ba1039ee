//! Shared timeout and size constants.

/// Default timeout, in milliseconds, used by blocking operations that don't
/// receive an explicit deadline from the caller.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// A short timeout used for internal polling loops (barrier waits, queue
/// condvar wakeups) that must recheck their predicate frequently.
pub const TINY_TIMEOUT_MS: u64 = 20;

/// A slightly longer internal polling timeout.
pub const SHORT_TIMEOUT_MS: u64 = 100;

/// Maximum length, in bytes, of a sanitized subscription key.
pub const MAX_SUBSCRIPTION_SIZE: usize = 1024;
