//! Monotonic clock with a process-wide reference instant.

use std::sync::OnceLock;
use std::time::Instant;

fn process_start() -> Instant {
    static START: OnceLock<Instant> = OnceLock::new();
    *START.get_or_init(Instant::now)
}

/// A monotonic millisecond/microsecond clock measured against a single
/// process-wide reference instant.
///
/// All `RelativeTime` values in a process share the same reference point, so
/// timestamps taken from different instances remain comparable.
#[derive(Debug, Clone, Copy)]
pub struct RelativeTime {
    started_at: Instant,
}

impl RelativeTime {
    /// Create a new clock with its own reference instant, taken now.
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    /// The process-wide singleton clock, lazily created on first access.
    ///
    /// Every call within a process observes the same reference instant.
    pub fn instance() -> Self {
        Self {
            started_at: process_start(),
        }
    }

    /// Milliseconds elapsed since this clock's reference instant.
    pub fn get_msec(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Microseconds elapsed since this clock's reference instant.
    pub fn get_usec(&self) -> u64 {
        self.started_at.elapsed().as_micros() as u64
    }

    /// The reference instant this clock measures against.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }
}

impl Default for RelativeTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn msec_and_usec_are_monotonic() {
        let clock = RelativeTime::new();
        let m1 = clock.get_msec();
        let u1 = clock.get_usec();
        thread::sleep(Duration::from_millis(5));
        let m2 = clock.get_msec();
        let u2 = clock.get_usec();
        assert!(m2 >= m1);
        assert!(u2 > u1);
    }

    #[test]
    fn singleton_shares_reference_instant_across_calls() {
        let a = RelativeTime::instance();
        let b = RelativeTime::instance();
        assert_eq!(a.started_at(), b.started_at());
    }

    #[test]
    fn singleton_and_fresh_instance_can_diverge() {
        let singleton = RelativeTime::instance();
        thread::sleep(Duration::from_millis(2));
        let fresh = RelativeTime::new();
        assert!(fresh.started_at() >= singleton.started_at());
    }
}
