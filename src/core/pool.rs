//! Fixed-size worker pool
//!
//! Workers drain a single FIFO queue of boxed closures. The queue and the
//! shutdown flag live under one mutex; idle workers block on a condition
//! variable until a task arrives or shutdown is requested.
//!
//! Dropping a pool drains every queued task before joining the workers.
//! The process-wide pool returned by [`WorkerPool::global`] is never dropped.

use crate::config::PoolConfig;
use crate::core::{BatchHandle, CompletionLatch};
use crate::error::{PoolCopyError, Result};
use crossbeam::utils::CachePadded;
use serde::Serialize;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};

/// A unit of work executed by exactly one worker
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Queue contents guarded by the pool mutex
struct QueueState {
    tasks: VecDeque<Task>,
    shutdown: bool,
}

/// State shared between the pool handle and its workers
struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
    scheduled: CachePadded<AtomicU64>,
    completed: CachePadded<AtomicU64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Tasks never run while the lock is held, so a poisoned lock still
        // guards a consistent queue.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a task is available, or return None once the queue is
    /// empty and shutdown has been requested.
    fn next_task(&self) -> Option<Task> {
        let mut state = self.lock();
        loop {
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            if state.shutdown {
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Point-in-time pool statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Number of worker threads
    pub workers: usize,
    /// Tasks accepted by `schedule` since construction
    pub tasks_scheduled: u64,
    /// Tasks that finished running
    pub tasks_completed: u64,
    /// Tasks waiting in the queue
    pub queued: usize,
}

impl PoolStats {
    /// Tasks scheduled but not yet finished (queued or running)
    pub fn in_flight(&self) -> u64 {
        self.tasks_scheduled.saturating_sub(self.tasks_completed)
    }
}

/// Fixed-size pool of worker threads fed by a FIFO task queue
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Create a pool with `threads` workers (0 = one per logical CPU)
    pub fn new(threads: usize) -> Result<Self> {
        Self::with_config(PoolConfig::with_threads(threads))
    }

    /// Create a pool from a configuration
    ///
    /// Workers are spawned immediately. If any worker fails to start, the
    /// ones already running are shut down and an error is returned.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        let threads = config.resolved_threads();

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
            scheduled: CachePadded::new(AtomicU64::new(0)),
            completed: CachePadded::new(AtomicU64::new(0)),
        });

        let mut pool = Self {
            shared,
            workers: Vec::with_capacity(threads),
        };

        for index in 0..threads {
            let name = format!("{}-{}", config.thread_name_prefix, index);
            let mut builder = thread::Builder::new().name(name.clone());
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let shared = Arc::clone(&pool.shared);
            let handle = builder
                .spawn(move || worker_loop(shared, name))
                .map_err(|e| {
                    PoolCopyError::thread_pool(format!("Failed to spawn worker {}: {}", index, e))
                })?;
            pool.workers.push(handle);
        }

        tracing::debug!("Started worker pool with {} workers", threads);
        Ok(pool)
    }

    /// Process-wide pool, created on first call with one worker per CPU
    ///
    /// Every call returns the same instance. The pool lives until the
    /// process exits and is never drained or joined.
    ///
    /// # Panics
    ///
    /// Panics if the first call cannot spawn the worker threads.
    pub fn global() -> &'static WorkerPool {
        static GLOBAL: OnceLock<WorkerPool> = OnceLock::new();

        GLOBAL.get_or_init(|| match WorkerPool::with_config(PoolConfig::global()) {
            Ok(pool) => pool,
            Err(e) => panic!("failed to start the global worker pool: {}", e),
        })
    }

    /// Queue a task for execution
    ///
    /// The task runs exactly once on some worker. Nothing is returned to
    /// the caller; completion has to be signalled from inside the task.
    pub fn schedule<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Box::new(task));
    }

    /// Queue a batch of tasks and return a handle that completes when all
    /// of them have run
    ///
    /// Waiting on the handle from inside a task of the same pool can
    /// deadlock once every worker is blocked that way.
    pub fn submit_batch<I, F>(&self, tasks: I) -> BatchHandle
    where
        I: IntoIterator<Item = F>,
        I::IntoIter: ExactSizeIterator,
        F: FnOnce() + Send + 'static,
    {
        let tasks = tasks.into_iter();
        let len = tasks.len();
        let latch = Arc::new(CompletionLatch::new(len));

        for task in tasks {
            let latch = Arc::clone(&latch);
            self.push(Box::new(move || {
                task();
                latch.count_down();
            }));
        }

        BatchHandle::new(latch, len)
    }

    fn push(&self, task: Task) {
        self.shared.scheduled.fetch_add(1, Ordering::Relaxed);
        self.shared.lock().tasks.push_back(task);
        self.shared.available.notify_one();
    }

    /// Number of worker threads
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of tasks waiting in the queue
    pub fn pending_count(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    /// Get statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.workers.len(),
            tasks_scheduled: self.shared.scheduled.load(Ordering::Relaxed),
            tasks_completed: self.shared.completed.load(Ordering::Relaxed),
            queued: self.pending_count(),
        }
    }

    /// Run every queued task, then stop and join all workers
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if self.workers.is_empty() {
            return;
        }

        let queued = {
            let mut state = self.shared.lock();
            state.shutdown = true;
            state.tasks.len()
        };
        self.shared.available.notify_all();

        tracing::debug!(
            "Shutting down worker pool ({} workers, {} tasks queued)",
            self.workers.len(),
            queued
        );

        for handle in std::mem::take(&mut self.workers) {
            if handle.join().is_err() {
                tracing::error!("Worker thread exited abnormally");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("stats", &self.stats())
            .finish()
    }
}

fn worker_loop(shared: Arc<Shared>, name: String) {
    tracing::trace!("Worker {} started", name);

    while let Some(task) = shared.next_task() {
        // A failing task is fatal: there is no error channel back to the
        // submitter, and callers blocked on a latch would wait forever.
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            tracing::error!("Task panicked on worker {}: {}", name, panic_message(&*payload));
            std::process::abort();
        }
        shared.completed.fetch_add(1, Ordering::Relaxed);
    }

    tracing::trace!("Worker {} shutting down", name);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
