//! Tunable configuration for the components in this crate.
//!
//! Every tunable is a plain constructor/builder field rather than an
//! environment-variable or config-file lookup; loading configuration from
//! the outside world is the embedding application's job.

use dq_core::constants::DEFAULT_TIMEOUT_MS;

/// Configuration for [`crate::AsyncWorker`].
#[derive(Debug, Clone, Copy)]
pub struct AsyncWorkerConfig {
    /// Number of consecutive failures tolerated before the worker gives up.
    pub n_retries_on_exception: u64,
    /// If true, a worker that exhausts its retry budget aborts the whole
    /// process (`std::process::abort()`) instead of exiting the loop
    /// cleanly. This is not a catchable panic: it takes down every thread in
    /// the process, including unrelated workers and, in a test binary, the
    /// test harness itself. Set this only when the caller genuinely wants a
    /// hard process kill on unrecoverable worker failure.
    pub die_on_exception: bool,
}

impl Default for AsyncWorkerConfig {
    fn default() -> Self {
        Self {
            n_retries_on_exception: 10,
            die_on_exception: false,
        }
    }
}

impl AsyncWorkerConfig {
    pub fn new(n_retries_on_exception: u64, die_on_exception: bool) -> Self {
        Self {
            n_retries_on_exception,
            die_on_exception,
        }
    }
}

/// Configuration for [`crate::ActiveQueue`].
#[derive(Debug, Clone, Copy)]
pub struct ActiveQueueConfig {
    /// Number of worker threads consuming the FIFO.
    pub n_threads: usize,
    /// How long idle workers wait on the queue condition variable before
    /// re-checking the stop flag.
    pub wakeup_freq_ms: u64,
}

impl ActiveQueueConfig {
    pub fn new(n_threads: usize) -> Self {
        Self {
            n_threads,
            wakeup_freq_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_wakeup_freq_ms(mut self, wakeup_freq_ms: u64) -> Self {
        self.wakeup_freq_ms = wakeup_freq_ms;
        self
    }
}

/// Configuration for [`crate::TimerService`].
#[derive(Debug, Clone, Copy)]
pub struct TimerServiceConfig {
    /// Maximum time between wakeups when no timer is due sooner.
    pub wakeup_freq_ms: u64,
}

impl Default for TimerServiceConfig {
    fn default() -> Self {
        Self {
            wakeup_freq_ms: 30_000,
        }
    }
}

impl TimerServiceConfig {
    pub fn new(wakeup_freq_ms: u64) -> Self {
        Self { wakeup_freq_ms }
    }
}
