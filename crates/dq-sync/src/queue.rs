//! A FIFO work queue backed by a fixed pool of worker threads.

use crate::barrier::Barrier;
use crate::config::ActiveQueueConfig;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct Progress {
    enqueued: u64,
    done: u64,
}

type QueueState<T> = (Mutex<VecDeque<T>>, Condvar);
type ProgressState = (Mutex<Progress>, Condvar);

/// A FIFO queue drained by a fixed pool of worker threads.
///
/// Handlers run outside the queue's own lock, and completions are tracked
/// through a separate progress mutex/condvar pair so a slow handler never
/// blocks producers from enqueueing more work.
pub struct ActiveQueue<T: Send + 'static> {
    queue: Arc<QueueState<T>>,
    progress: Arc<ProgressState>,
    stop: Arc<AtomicBool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Send + 'static> ActiveQueue<T> {
    /// Start `config.n_threads` worker threads that will invoke `handler`
    /// for each pushed item. Blocks until every worker thread has reached
    /// its startup rendezvous, so `push` immediately after construction is
    /// safe.
    pub fn new<H>(config: ActiveQueueConfig, handler: H) -> Self
    where
        H: Fn(T) + Send + Sync + 'static,
    {
        let queue: Arc<QueueState<T>> = Arc::new((Mutex::new(VecDeque::new()), Condvar::new()));
        let progress: Arc<ProgressState> =
            Arc::new((Mutex::new(Progress { enqueued: 0, done: 0 }), Condvar::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let handler = Arc::new(handler);
        let startup_barrier = Arc::new(Barrier::new(config.n_threads as u32 + 1));
        let wakeup_freq = Duration::from_millis(config.wakeup_freq_ms);

        let mut threads = Vec::with_capacity(config.n_threads);
        for i in 0..config.n_threads {
            let queue = queue.clone();
            let progress = progress.clone();
            let stop = stop.clone();
            let handler = handler.clone();
            let startup_barrier = startup_barrier.clone();
            threads.push(
                thread::Builder::new()
                    .name(format!("dq-active-queue-{}", i))
                    .spawn(move || {
                        worker_entry(queue, progress, stop, handler, startup_barrier, wakeup_freq)
                    })
                    .expect("failed to spawn active queue worker thread"),
            );
        }

        // blocks until every worker has reached its first wait, so a push
        // immediately after construction can't be missed
        startup_barrier.wait();
        thread::yield_now();

        Self {
            queue,
            progress,
            stop,
            threads: Mutex::new(threads),
        }
    }

    /// Enqueue an item. A no-op once the queue has been stopped.
    pub fn push(&self, item: T) {
        if self.stopped() {
            return;
        }
        {
            let mut p = self.progress.0.lock().unwrap();
            p.enqueued += 1;
        }
        {
            let mut q = self.queue.0.lock().unwrap();
            q.push_back(item);
            self.queue.1.notify_one();
        }
    }

    /// Whether `stop()` has been called.
    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Number of items pushed so far.
    pub fn n_enqueued(&self) -> u64 {
        self.progress.0.lock().unwrap().enqueued
    }

    /// Number of handler invocations completed so far.
    pub fn n_done(&self) -> u64 {
        self.progress.0.lock().unwrap().done
    }

    /// Wait until every enqueued item has been handled, or until no
    /// progress is observed for `progress_for`.
    ///
    /// This is a liveness guarantee, not a fixed deadline: as long as
    /// handlers keep completing, repeated calls eventually return `true`.
    /// It only gives up once a full `progress_for` window passes with zero
    /// completions.
    pub fn wait_empty(&self, progress_for: Duration) -> bool {
        let (mut enqueued_items, mut done_items) = {
            let p = self.progress.0.lock().unwrap();
            (p.enqueued, p.done)
        };

        while enqueued_items > done_items && !self.stopped() {
            let last_done = done_items;
            let mut timed_out = false;
            {
                let mut p = self.progress.0.lock().unwrap();
                if p.enqueued > p.done {
                    let (guard, result) = self.progress.1.wait_timeout(p, progress_for).unwrap();
                    p = guard;
                    timed_out = result.timed_out();
                }
                enqueued_items = p.enqueued;
                done_items = p.done;
            }
            if last_done == done_items && timed_out {
                break;
            }
        }

        enqueued_items == done_items
    }

    /// Stop accepting new progress, wake every waiting worker, and join all
    /// worker threads. Idempotent: a second call is a no-op.
    pub fn stop(&self) {
        if self.stop.swap(true, Ordering::SeqCst) {
            return;
        }
        self.queue.1.notify_all();
        self.progress.1.notify_all();
        let mut threads = self.threads.lock().unwrap();
        for t in threads.drain(..) {
            let _ = t.join();
        }
    }
}

impl<T: Send + 'static> Drop for ActiveQueue<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_entry<T: Send + 'static>(
    queue: Arc<QueueState<T>>,
    progress: Arc<ProgressState>,
    stop: Arc<AtomicBool>,
    handler: Arc<dyn Fn(T) + Send + Sync>,
    startup_barrier: Arc<Barrier>,
    wakeup_freq: Duration,
) {
    startup_barrier.wait();

    while !stop.load(Ordering::SeqCst) {
        let item = {
            let mut q = queue.0.lock().unwrap();
            if q.is_empty() {
                let (guard, _) = queue.1.wait_timeout(q, wakeup_freq).unwrap();
                q = guard;
            }
            q.pop_front()
        };

        if let Some(item) = item {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(item))).is_err() {
                log::error!("active queue handler panicked");
            }
            let mut p = progress.0.lock().unwrap();
            p.done += 1;
            progress.1.notify_one();
        }
    }
}
