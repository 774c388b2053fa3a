//! Bounded worker pool for running slow operations in the background.
//!
//! Tasks are queued FIFO and picked up by a fixed number of worker threads.
//! A task can be cancelled until a worker starts it; after that it runs to
//! completion.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Default number of worker threads.
pub const DEFAULT_MAX_WORKERS: usize = 5;

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLED: u8 = 2;

/// Identifier assigned to a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task_{}", self.0)
    }
}

/// Snapshot of a task that has not finished yet.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub id: TaskId,
    pub started_at: Option<Instant>,
    pub cancelled: bool,
}

impl TaskInfo {
    /// Time since the task started, if it has.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }
}

struct Job {
    id: TaskId,
    state: Arc<AtomicU8>,
    run: Box<dyn FnOnce() + Send>,
}

type ActiveMap = Arc<Mutex<HashMap<TaskId, TaskInfo>>>;

/// Handle to a submitted task.
pub struct TaskHandle<T> {
    id: TaskId,
    state: Arc<AtomicU8>,
    active: ActiveMap,
    result: Receiver<T>,
}

impl<T> TaskHandle<T> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Cancel the task if no worker has started it. Returns whether it was
    /// cancelled.
    pub fn cancel(&self) -> bool {
        let cancelled = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if cancelled {
            if let Ok(mut active) = self.active.lock() {
                if let Some(info) = active.get_mut(&self.id) {
                    info.cancelled = true;
                }
            }
            tracing::debug!(task = %self.id, "task cancelled");
        }
        cancelled
    }

    /// Block until the task finishes. `None` means it was cancelled,
    /// panicked, or the pool shut down before running it.
    pub fn wait(self) -> Option<T> {
        self.result.recv().ok()
    }
}

/// Fixed-size pool of worker threads fed from a FIFO queue.
pub struct TaskPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    active: ActiveMap,
    next_id: AtomicU64,
}

impl TaskPool {
    /// Start a pool with `max_workers` threads (at least one).
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let active: ActiveMap = Arc::default();

        let workers = (0..max_workers)
            .map(|n| {
                let receiver = Arc::clone(&receiver);
                let active = Arc::clone(&active);
                std::thread::Builder::new()
                    .name(format!("repo-manager-worker-{}", n))
                    .spawn(move || worker_loop(&receiver, &active))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::error!(error = %e, "failed to spawn worker thread");
                    None
                }
            })
            .collect::<Vec<_>>();

        tracing::info!(workers = workers.len(), "task pool started");
        Self {
            sender: Some(sender),
            workers,
            active,
            next_id: AtomicU64::new(0),
        }
    }

    /// Queue `f` for execution.
    pub fn submit<F, T>(&self, f: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let state = Arc::new(AtomicU8::new(PENDING));
        let (tx, rx) = mpsc::channel();

        if let Ok(mut active) = self.active.lock() {
            active.insert(
                id,
                TaskInfo {
                    id,
                    started_at: None,
                    cancelled: false,
                },
            );
        }

        let job = Job {
            id,
            state: Arc::clone(&state),
            run: Box::new(move || {
                let _ = tx.send(f());
            }),
        };

        if let Some(sender) = &self.sender {
            if sender.send(job).is_err() {
                tracing::warn!(task = %id, "task pool is shut down; task dropped");
            } else {
                tracing::debug!(task = %id, "task submitted");
            }
        }

        TaskHandle {
            id,
            state,
            active: Arc::clone(&self.active),
            result: rx,
        }
    }

    /// Tasks that are queued or running.
    pub fn active_tasks(&self) -> Vec<TaskInfo> {
        let mut tasks: Vec<TaskInfo> = self
            .active
            .lock()
            .map(|active| active.values().cloned().collect())
            .unwrap_or_default();
        tasks.sort_by_key(|t| t.id);
        tasks
    }

    /// Stop accepting work, skip queued tasks and wait for running ones.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            for info in active.values_mut() {
                if info.started_at.is_none() {
                    info.cancelled = true;
                }
            }
        }
        // Closing the channel ends each worker once the queue drains
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        tracing::info!("task pool stopped");
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        if self.sender.is_some() {
            self.stop();
        }
    }
}

fn worker_loop(receiver: &Mutex<Receiver<Job>>, active: &Mutex<HashMap<TaskId, TaskInfo>>) {
    loop {
        let job = match receiver.lock() {
            Ok(rx) => match rx.recv() {
                Ok(job) => job,
                Err(_) => return,
            },
            Err(_) => return,
        };

        let shutting_down = active
            .lock()
            .map(|a| a.get(&job.id).is_some_and(|info| info.cancelled))
            .unwrap_or(false);
        if shutting_down {
            job.state.store(CANCELLED, Ordering::Release);
        }

        let start = job
            .state
            .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire);

        if start.is_ok() {
            if let Ok(mut a) = active.lock() {
                if let Some(info) = a.get_mut(&job.id) {
                    info.started_at = Some(Instant::now());
                }
            }
            if catch_unwind(AssertUnwindSafe(job.run)).is_err() {
                tracing::error!(task = %job.id, "task panicked");
            }
        } else {
            tracing::debug!(task = %job.id, "skipping cancelled task");
        }

        if let Ok(mut a) = active.lock() {
            a.remove(&job.id);
        }
    }
}
