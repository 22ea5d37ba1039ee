//! A supervised background thread with retry/backoff and captured-error
//! rethrow.

use crate::barrier::Barrier;
use crate::config::AsyncWorkerConfig;
use dq_core::DqError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A boolean-returning action run repeatedly on a dedicated background
/// thread until it returns `Ok(false)`, is stopped, or exhausts its retry
/// budget after repeated errors.
pub type Action = Box<dyn FnMut() -> Result<bool, DqError> + Send>;

/// Runs `action` on a single background thread, supervising it against
/// transient failures.
///
/// The thread is spawned at construction but parked behind a start latch
/// until [`AsyncWorker::start`] is called, so construction never races with
/// the caller finishing its own setup. `stop` (and `Drop`) release the
/// thread and join it.
pub struct AsyncWorker {
    start_barrier: Arc<Barrier>,
    stop_barrier: Arc<Barrier>,
    stop: Arc<AtomicBool>,
    started: Arc<AtomicBool>,
    error: Arc<Mutex<Option<DqError>>>,
    thread: Option<JoinHandle<()>>,
}

impl AsyncWorker {
    /// Construct a worker around `action` and spawn its background thread.
    /// The thread blocks immediately until [`AsyncWorker::start`] is called.
    pub fn new<F>(action: F, config: AsyncWorkerConfig) -> Self
    where
        F: FnMut() -> Result<bool, DqError> + Send + 'static,
    {
        let start_barrier = Arc::new(Barrier::new(2));
        let stop_barrier = Arc::new(Barrier::new(2));
        let stop = Arc::new(AtomicBool::new(false));
        let started = Arc::new(AtomicBool::new(false));
        let error: Arc<Mutex<Option<DqError>>> = Arc::new(Mutex::new(None));

        let thread = {
            let start_barrier = start_barrier.clone();
            let stop_barrier = stop_barrier.clone();
            let stop = stop.clone();
            let started = started.clone();
            let error = error.clone();
            thread::Builder::new()
                .name("dq-async-worker".to_string())
                .spawn(move || {
                    entry(
                        Box::new(action),
                        config,
                        start_barrier,
                        stop_barrier,
                        stop,
                        started,
                        error,
                    )
                })
                .expect("failed to spawn async worker thread")
        };

        Self {
            start_barrier,
            stop_barrier,
            stop,
            started,
            error,
            thread: Some(thread),
        }
    }

    /// Release the start latch so the worker thread begins invoking its
    /// action. Safe to call exactly once; later calls just return
    /// immediately since the latch is already open.
    pub fn start(&self) {
        self.start_barrier.wait();
    }

    /// Signal the worker to stop and wait for its loop to exit.
    ///
    /// Safe to call whether or not `start()` was ever called, and safe to
    /// call more than once.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if !self.started.load(Ordering::SeqCst) {
            self.start_barrier.wait();
        }
        self.stop_barrier.wait();
    }

    /// Take the most recently captured error, if any, clearing the slot so
    /// a later call returns `None` until a new error is captured.
    pub fn take_error(&self) -> Option<DqError> {
        self.error.lock().unwrap().take()
    }
}

fn entry(
    mut action: Action,
    config: AsyncWorkerConfig,
    start_barrier: Arc<Barrier>,
    stop_barrier: Arc<Barrier>,
    stop: Arc<AtomicBool>,
    started: Arc<AtomicBool>,
    error: Arc<Mutex<Option<DqError>>>,
) {
    start_barrier.wait();
    started.store(true, Ordering::SeqCst);

    let mut exceptions_caught: u64 = 0;
    while !stop.load(Ordering::SeqCst) {
        match action() {
            Ok(true) => {
                exceptions_caught = 0;
                *error.lock().unwrap() = None;
            }
            Ok(false) => break,
            Err(e) => {
                exceptions_caught += 1;
                log::error!(
                    "async worker caught error (attempt {}): {}",
                    exceptions_caught,
                    e
                );
                *error.lock().unwrap() = Some(e);
                thread::sleep(Duration::from_secs(exceptions_caught));

                if exceptions_caught > config.n_retries_on_exception {
                    log::error!(
                        "stopping worker loop after {} consecutive errors",
                        exceptions_caught
                    );
                    if config.die_on_exception {
                        // Mirrors an uncaught exception escaping the worker
                        // loop: the process goes down rather than limping
                        // along, so there is no attempt to release the stop
                        // latch gracefully here.
                        log::error!("aborting process: die_on_exception is set");
                        std::process::abort();
                    }
                    break;
                }
            }
        }
    }
    stop_barrier.wait();
}

impl Drop for AsyncWorker {
    fn drop(&mut self) {
        self.stop();
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}
