//! A block x column table collector: producers fill in columns of a row
//! identified by `block_id` from independent threads, and consumers wait for
//! a row to become complete (or for a deadline, or for [`TableCollector::stop`]).
//!
//! Grounded on a C++ `table_collector` that keeps one condition variable per
//! table and a `std::map<block_id, block>`; a block tracks a running "filled
//! columns" counter incremented on each first-write to a slot. This port
//! drops that counter in favor of computing the filled count as `n_columns -
//! count of still-null slots` on read, since both are O(n_columns) but the
//! derived form can't drift out of sync with repeated overwrites of the same
//! column (see the Open Question this resolves in the design notes).

use dq_core::{DqError, DqResult, RelativeTime};
use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// One row of a table: one slot per column, filled independently and
/// possibly overwritten.
struct Block<T> {
    slots: Vec<Option<Arc<T>>>,
    last_updated_ms: u64,
}

impl<T> Block<T> {
    fn new(n_columns: usize) -> Self {
        Self {
            slots: vec![None; n_columns],
            last_updated_ms: 0,
        }
    }

    fn reset(&mut self) {
        for s in self.slots.iter_mut() {
            *s = None;
        }
        self.last_updated_ms = 0;
    }

    fn count_filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn is_complete(&self) -> bool {
        self.count_filled() == self.slots.len()
    }

    fn set_col(&mut self, col_id: usize, value: Arc<T>) {
        self.slots[col_id] = Some(value);
        self.last_updated_ms = RelativeTime::instance().get_msec();
    }
}

/// A snapshot of a block's row handed back to a `get()` caller: one slot per
/// column (`None` where the column has not been filled yet), alongside how
/// many of those slots are filled.
pub struct Row<T> {
    pub columns: Vec<Option<Arc<T>>>,
    pub filled: usize,
}

/// Collects column values into rows keyed by `block_id`. Safe to share across
/// threads via `Arc`; all operations lock internally.
pub struct TableCollector<T> {
    n_columns: usize,
    inner: Mutex<BTreeMap<usize, Block<T>>>,
    cond: Condvar,
    stopped: std::sync::atomic::AtomicBool,
}

impl<T> TableCollector<T> {
    pub fn new(n_columns: usize) -> Self {
        Self {
            n_columns,
            inner: Mutex::new(BTreeMap::new()),
            cond: Condvar::new(),
            stopped: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.stopped.store(true, std::sync::atomic::Ordering::SeqCst);
        self.cond.notify_all();
    }

    pub fn insert(&self, block_id: usize, col_id: usize, value: Arc<T>) -> DqResult<()> {
        if col_id >= self.n_columns {
            log::error!(
                "insert: col_id {} out of bounds, n_columns {}",
                col_id,
                self.n_columns
            );
            return Err(DqError::invalid_argument(format!(
                "col_id {} out of bounds for {} columns",
                col_id, self.n_columns
            )));
        }
        let mut guard = self.inner.lock().unwrap();
        let block = guard
            .entry(block_id)
            .or_insert_with(|| Block::new(self.n_columns));
        block.set_col(col_id, value);
        if block.is_complete() {
            self.cond.notify_all();
        }
        Ok(())
    }

    pub fn erase(&self, block_id: usize) {
        let mut guard = self.inner.lock().unwrap();
        if let Some(block) = guard.get_mut(&block_id) {
            block.reset();
        }
    }

    /// Return the row for `block_id`, waiting up to `timeout_ms` for it to
    /// become complete if it isn't already. Returns whatever is present once
    /// the deadline passes, the collector stops, or the row completes.
    pub fn get(&self, block_id: usize, timeout_ms: u64) -> Row<T> {
        let guard = self.inner.lock().unwrap();
        if let Some(block) = guard.get(&block_id) {
            if block.is_complete() {
                return Row {
                    columns: block.slots.clone(),
                    filled: block.count_filled(),
                };
            }
        }

        let deadline = Duration::from_millis(timeout_ms);
        let (mut guard, _timeout_result) = self
            .cond
            .wait_timeout_while(guard, deadline, |map| {
                if self.stopped() {
                    return false;
                }
                match map.get(&block_id) {
                    Some(block) => !block.is_complete(),
                    None => true,
                }
            })
            .unwrap();

        match guard.get_mut(&block_id) {
            Some(block) => Row {
                columns: block.slots.clone(),
                filled: block.count_filled(),
            },
            None => Row {
                columns: vec![None; self.n_columns],
                filled: 0,
            },
        }
    }

    pub fn last_updated(&self, block_id: usize) -> u64 {
        let guard = self.inner.lock().unwrap();
        guard.get(&block_id).map(|b| b.last_updated_ms).unwrap_or(0)
    }

    pub fn missing_columns(&self, block_id: usize) -> usize {
        let guard = self.inner.lock().unwrap();
        match guard.get(&block_id) {
            Some(block) => block.slots.len() - block.count_filled(),
            None => self.n_columns,
        }
    }

    pub fn max_block_id(&self) -> usize {
        let guard = self.inner.lock().unwrap();
        guard.keys().next_back().copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;
    use std::thread;

    #[test]
    fn insert_rejects_out_of_range_column() {
        let t: TableCollector<i32> = TableCollector::new(3);
        assert!(t.insert(0, 3, StdArc::new(1)).is_err());
    }

    #[test]
    fn get_returns_immediately_once_all_columns_filled() {
        let t: TableCollector<i32> = TableCollector::new(2);
        t.insert(7, 0, StdArc::new(10)).unwrap();
        t.insert(7, 1, StdArc::new(20)).unwrap();
        let row = t.get(7, 1000);
        assert_eq!(row.filled, 2);
        assert_eq!(*row.columns[0].as_ref().unwrap().as_ref(), 10);
        assert_eq!(*row.columns[1].as_ref().unwrap().as_ref(), 20);
    }

    #[test]
    fn get_times_out_with_partial_row() {
        let t: TableCollector<i32> = TableCollector::new(2);
        t.insert(1, 0, StdArc::new(1)).unwrap();
        let row = t.get(1, 50);
        assert_eq!(row.filled, 1);
        assert!(row.columns[1].is_none());
    }

    #[test]
    fn erase_resets_but_keeps_the_block_present() {
        let t: TableCollector<i32> = TableCollector::new(1);
        t.insert(1, 0, StdArc::new(1)).unwrap();
        t.erase(1);
        assert_eq!(t.missing_columns(1), 1);
        assert_eq!(t.last_updated(1), 0);
    }

    #[test]
    fn overwriting_a_column_does_not_inflate_the_filled_count() {
        let t: TableCollector<i32> = TableCollector::new(2);
        t.insert(1, 0, StdArc::new(1)).unwrap();
        t.insert(1, 0, StdArc::new(2)).unwrap();
        assert_eq!(t.missing_columns(1), 1);
    }

    #[test]
    fn max_block_id_tracks_highest_inserted_block() {
        let t: TableCollector<i32> = TableCollector::new(1);
        t.insert(3, 0, StdArc::new(1)).unwrap();
        t.insert(9, 0, StdArc::new(1)).unwrap();
        t.insert(5, 0, StdArc::new(1)).unwrap();
        assert_eq!(t.max_block_id(), 9);
    }

    #[test]
    fn stop_wakes_a_waiting_getter_before_its_deadline() {
        let t = StdArc::new(TableCollector::<i32>::new(2));
        t.insert(1, 0, StdArc::new(1)).unwrap();
        let t2 = t.clone();
        let handle = thread::spawn(move || t2.get(1, 5000));
        thread::sleep(Duration::from_millis(20));
        t.stop();
        let row = handle.join().unwrap();
        assert_eq!(row.filled, 1);
    }

    #[test]
    fn missing_columns_on_unknown_block_is_full_width() {
        let t: TableCollector<i32> = TableCollector::new(4);
        assert_eq!(t.missing_columns(99), 4);
    }
}
