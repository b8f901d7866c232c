//! Fan-in synchronization for batches of pool tasks
//!
//! A [`CompletionLatch`] is an atomic countdown paired with a one-shot
//! notification: the task that takes the count to zero releases every
//! waiter. [`BatchHandle`] wraps a latch shared with the tasks of one
//! [`WorkerPool::submit_batch`](crate::core::WorkerPool::submit_batch) call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Countdown that fires a single completion signal when it reaches zero
#[derive(Debug)]
pub struct CompletionLatch {
    remaining: AtomicUsize,
    released: Mutex<bool>,
    signal: Condvar,
}

impl CompletionLatch {
    /// Create a latch expecting `count` calls to [`count_down`](Self::count_down)
    ///
    /// A latch created with zero is already released.
    pub fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
            released: Mutex::new(count == 0),
            signal: Condvar::new(),
        }
    }

    /// Record one completed unit of work
    ///
    /// Returns true for the call that released the latch. AcqRel ordering
    /// makes the writes of every earlier caller visible to the releaser, and
    /// the mutex hands them on to the waiters.
    pub fn count_down(&self) -> bool {
        let previous = self.remaining.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "latch counted down past zero");

        if previous != 1 {
            return false;
        }

        *self.released.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.signal.notify_all();
        true
    }

    /// Block until the count reaches zero
    pub fn wait(&self) {
        let mut released = self.released.lock().unwrap_or_else(PoisonError::into_inner);
        while !*released {
            released = self
                .signal
                .wait(released)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Check whether the latch has been released
    pub fn is_released(&self) -> bool {
        *self.released.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Units of work still outstanding
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}

/// Handle representing "every task of the batch has run"
#[derive(Debug, Clone)]
pub struct BatchHandle {
    latch: Arc<CompletionLatch>,
    len: usize,
}

impl BatchHandle {
    pub(crate) fn new(latch: Arc<CompletionLatch>, len: usize) -> Self {
        Self { latch, len }
    }

    /// Number of tasks in the batch
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the batch was empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check whether every task has finished, without blocking
    pub fn is_complete(&self) -> bool {
        self.latch.is_released()
    }

    /// Block until every task has finished
    pub fn wait(self) {
        self.latch.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_zero_count_is_released() {
        let latch = CompletionLatch::new(0);
        assert!(latch.is_released());
        latch.wait();
    }

    #[test]
    fn test_only_last_count_down_releases() {
        let latch = CompletionLatch::new(3);
        assert!(!latch.count_down());
        assert!(!latch.count_down());
        assert!(!latch.is_released());
        assert_eq!(latch.remaining(), 1);

        assert!(latch.count_down());
        assert!(latch.is_released());
        assert_eq!(latch.remaining(), 0);
    }

    #[test]
    fn test_exactly_one_releaser_across_threads() {
        let latch = Arc::new(CompletionLatch::new(16));

        let releasers: usize = (0..16)
            .map(|_| {
                let latch = Arc::clone(&latch);
                thread::spawn(move || latch.count_down())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap() as usize)
            .sum();

        assert_eq!(releasers, 1);
        latch.wait();
    }

    #[test]
    fn test_wait_blocks_until_released() {
        let latch = Arc::new(CompletionLatch::new(2));

        let worker = {
            let latch = Arc::clone(&latch);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                latch.count_down();
                thread::sleep(Duration::from_millis(20));
                latch.count_down();
            })
        };

        latch.wait();
        assert_eq!(latch.remaining(), 0);
        worker.join().unwrap();
    }

    #[test]
    fn test_batch_handle() {
        let latch = Arc::new(CompletionLatch::new(2));
        let handle = BatchHandle::new(Arc::clone(&latch), 2);
        assert_eq!(handle.len(), 2);
        assert!(!handle.is_empty());
        assert!(!handle.is_complete());

        latch.count_down();
        latch.count_down();
        assert!(handle.is_complete());
        handle.wait();

        let empty = BatchHandle::new(Arc::new(CompletionLatch::new(0)), 0);
        assert!(empty.is_empty());
        assert!(empty.is_complete());
    }
}
