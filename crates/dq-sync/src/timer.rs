//! A priority-driven timer service built on top of [`crate::AsyncWorker`].

use crate::config::{AsyncWorkerConfig, TimerServiceConfig};
use crate::worker::AsyncWorker;
use dq_core::DqError;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// A scheduled action, plus the interval it reschedules itself at if it
/// returns `true` and `duration_ms > 0`.
pub type TimerAction = Box<dyn FnMut() -> Result<bool, DqError> + Send>;

struct TimerItem {
    when: Instant,
    what: TimerAction,
    duration_ms: u64,
}

impl PartialEq for TimerItem {
    fn eq(&self, other: &Self) -> bool {
        self.when == other.when
    }
}
impl Eq for TimerItem {}

impl PartialOrd for TimerItem {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerItem {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // BinaryHeap is a max-heap; reverse the comparison on `when` so the
        // earliest deadline sorts to the top.
        other.when.cmp(&self.when)
    }
}

type Schedule = (Mutex<BinaryHeap<TimerItem>>, Condvar);

/// Runs scheduled closures on a dedicated background worker, waking at most
/// every `wakeup_freq_ms` unless an earlier deadline is scheduled.
pub struct TimerService {
    schedule: Arc<Schedule>,
    wakeup_freq: Duration,
    worker: AsyncWorker,
}

impl TimerService {
    pub fn new(config: TimerServiceConfig) -> Self {
        let schedule: Arc<Schedule> = Arc::new((Mutex::new(BinaryHeap::new()), Condvar::new()));
        let wakeup_freq = Duration::from_millis(config.wakeup_freq_ms);

        let worker_schedule = schedule.clone();
        let worker = AsyncWorker::new(
            move || Ok(run_due_items(&worker_schedule, wakeup_freq)),
            AsyncWorkerConfig::default(),
        );
        worker.start();

        Self {
            schedule,
            wakeup_freq,
            worker,
        }
    }

    /// Schedule `what` to run at `when`. If `when` is already in the past
    /// the worker is notified unconditionally so the action isn't delayed
    /// behind the regular wakeup cadence.
    pub fn schedule_at(
        &self,
        when: Instant,
        what: impl FnMut() -> Result<bool, DqError> + Send + 'static,
    ) {
        let now = Instant::now();
        let max_wait = now + self.wakeup_freq;

        let (duration_ms, always_notify) = if when > now {
            (when.duration_since(now).as_millis() as u64, false)
        } else {
            (0, true)
        };

        let item = TimerItem {
            when,
            what: Box::new(what),
            duration_ms,
        };

        let mut guard = self.schedule.0.lock().unwrap();
        guard.push(item);
        drop(guard);

        if always_notify || when < max_wait {
            self.schedule.1.notify_one();
        }
    }

    /// Schedule `what` to run `run_after_ms` milliseconds from now. If it
    /// returns `true`, it reschedules itself at the same interval.
    pub fn schedule_after(
        &self,
        run_after_ms: u64,
        what: impl FnMut() -> Result<bool, DqError> + Send + 'static,
    ) {
        let now = Instant::now();
        let when = now + Duration::from_millis(run_after_ms);
        let max_wait = now + self.wakeup_freq;

        let item = TimerItem {
            when,
            what: Box::new(what),
            duration_ms: run_after_ms,
        };

        let mut guard = self.schedule.0.lock().unwrap();
        guard.push(item);
        drop(guard);

        if when < max_wait {
            self.schedule.1.notify_one();
        }
    }

    /// Take the timer worker's most recently captured error, if any.
    pub fn take_error(&self) -> Option<DqError> {
        self.worker.take_error()
    }
}

/// One wakeup cycle: drain all due items under the lock, wait for the next
/// deadline if nothing was due, then run the drained items outside the lock.
fn run_due_items(schedule: &Arc<Schedule>, wakeup_freq: Duration) -> bool {
    let now = Instant::now();
    let mut max_wait = now + wakeup_freq;
    let mut run_these = Vec::new();

    {
        let mut guard = schedule.0.lock().unwrap();
        loop {
            match guard.peek() {
                Some(top) if top.when < now => {
                    run_these.push(guard.pop().unwrap());
                }
                Some(top) => {
                    if top.when < max_wait {
                        max_wait = top.when;
                    }
                    break;
                }
                None => break,
            }
        }

        if run_these.is_empty() {
            let wait_for = max_wait.saturating_duration_since(Instant::now());
            let (_guard, _) = schedule.1.wait_timeout(guard, wait_for).unwrap();
        }
    }

    for mut item in run_these {
        match (item.what)() {
            Ok(should_reschedule) => {
                if should_reschedule && item.duration_ms > 0 {
                    item.when += Duration::from_millis(item.duration_ms);
                    schedule.0.lock().unwrap().push(item);
                }
            }
            Err(e) => {
                log::warn!("timer action failed, not rescheduling: {}", e);
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;

    #[test]
    fn one_shot_fires_once() {
        let svc = TimerService::new(TimerServiceConfig::default());
        let calls = Arc::new(AtomicU64::new(0));
        let calls_in_action = calls.clone();
        svc.schedule_after(20, move || {
            calls_in_action.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        });

        thread::sleep(Duration::from_millis(200));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn periodic_action_reschedules_itself() {
        let svc = TimerService::new(TimerServiceConfig::default());
        let calls = Arc::new(AtomicU64::new(0));
        let calls_in_action = calls.clone();
        svc.schedule_after(10, move || {
            calls_in_action.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        });

        thread::sleep(Duration::from_millis(150));
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn past_deadline_runs_promptly_even_with_long_wakeup_freq() {
        let svc = TimerService::new(TimerServiceConfig::new(30_000));
        let calls = Arc::new(AtomicU64::new(0));
        let calls_in_action = calls.clone();
        let when = Instant::now() - Duration::from_millis(1);
        svc.schedule_at(when, move || {
            calls_in_action.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        });

        thread::sleep(Duration::from_millis(200));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn erroring_action_is_not_rescheduled() {
        let svc = TimerService::new(TimerServiceConfig::default());
        let calls = Arc::new(AtomicU64::new(0));
        let calls_in_action = calls.clone();
        svc.schedule_after(10, move || {
            calls_in_action.fetch_add(1, Ordering::SeqCst);
            Err(DqError::internal("boom"))
        });

        thread::sleep(Duration::from_millis(300));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
