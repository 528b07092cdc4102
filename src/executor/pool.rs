//! Worker pool management.
//!
//! A fixed set of OS threads pulling tasks from a shared FIFO channel. At
//! most `size` tasks execute at once; excess submissions wait in the channel
//! until a worker frees up.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::RwLock;
use tracing::{debug, error, info};

use super::completion::Completion;
use super::handle::JobHandle;
use crate::runner::{RunnerError, RunnerResult};

type Task = Box<dyn FnOnce() + Send + 'static>;
type Envelope = (Arc<JobHandle>, Task);

/// Worker identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(pub usize);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Worker pool configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of worker threads, i.e. maximum concurrently running tasks
    pub size: usize,
    /// Prefix for worker thread names
    pub thread_name_prefix: String,
    /// Stack size of each worker thread; the platform default when unset
    pub stack_size: Option<usize>,
}

impl WorkerConfig {
    /// Configuration for `size` workers
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Sets the worker stack size
    #[must_use]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            size: 10,
            thread_name_prefix: "jobrunner".to_string(),
            stack_size: None,
        }
    }
}

struct Shared {
    // `None` once the pool is shut down. Workers hold the read side while
    // they begin a handle, so no handle begins after shutdown.
    sender: RwLock<Option<Sender<Envelope>>>,
    active: AtomicUsize,
    completion: Arc<Completion>,
}

impl Shared {
    fn shutdown_with<F: FnOnce()>(&self, before_close: F) -> bool {
        let mut sender = self.sender.write();
        if sender.take().is_none() {
            return false;
        }
        before_close();
        drop(sender);
        self.completion.close();
        true
    }

    fn is_shutdown(&self) -> bool {
        self.sender.read().is_none()
    }
}

/// Cloneable control surface of a [`WorkerPool`].
///
/// Handed to tasks that need to stop the pool from a worker thread without
/// owning the pool (and its join handles).
#[derive(Clone)]
pub struct PoolControl {
    shared: Arc<Shared>,
}

impl PoolControl {
    /// Stops accepting submissions. Returns true only for the call that
    /// actually performed the shutdown.
    pub fn shutdown(&self) -> bool {
        self.shared.shutdown_with(|| {})
    }

    /// Like [`shutdown`](Self::shutdown), but runs `before_close` while no
    /// worker can begin a handle, and before waiters on the completion
    /// signal wake. `before_close` only runs for the call that performed the
    /// shutdown.
    pub fn shutdown_with<F: FnOnce()>(&self, before_close: F) -> bool {
        self.shared.shutdown_with(before_close)
    }

    /// Returns true once the pool has been shut down
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.is_shutdown()
    }
}

impl std::fmt::Debug for PoolControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolControl")
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

/// Bounded worker pool
pub struct WorkerPool {
    config: WorkerConfig,
    shared: Arc<Shared>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `config.size` workers (at least one).
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::WorkerSpawn`] if the OS refuses a thread; the
    /// workers spawned so far are shut down and joined.
    pub fn new(config: WorkerConfig) -> RunnerResult<Self> {
        let size = config.size.max(1);
        let (sender, receiver) = unbounded();
        let shared = Arc::new(Shared {
            sender: RwLock::new(Some(sender)),
            active: AtomicUsize::new(0),
            completion: Arc::new(Completion::new()),
        });

        let mut pool = Self {
            config: WorkerConfig { size, ..config },
            shared,
            workers: Vec::new(),
        };

        for i in 0..size {
            let id = WorkerId(i);
            let shared = Arc::clone(&pool.shared);
            let receiver = receiver.clone();
            let mut builder =
                thread::Builder::new().name(format!("{}-{}", pool.config.thread_name_prefix, id));
            if let Some(bytes) = pool.config.stack_size {
                builder = builder.stack_size(bytes);
            }

            match builder.spawn(move || run_worker(id, &shared, &receiver)) {
                Ok(handle) => pool.workers.push(handle),
                Err(e) => {
                    // Drop shuts down and joins what was spawned.
                    return Err(RunnerError::WorkerSpawn {
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!("Worker pool started with {} workers", size);
        Ok(pool)
    }

    /// Spawns a pool of `size` workers with default naming
    ///
    /// # Errors
    ///
    /// See [`WorkerPool::new`].
    pub fn with_size(size: usize) -> RunnerResult<Self> {
        Self::new(WorkerConfig::new(size))
    }

    /// Queues `task` to run on a worker once `handle` can begin.
    ///
    /// The worker marks the handle RUNNING before the task and COMPLETED
    /// after it. A handle withdrawn while queued is skipped, and handles
    /// still queued at shutdown are withdrawn instead of started.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::PoolShutdown`] after [`shutdown`](Self::shutdown).
    pub fn submit<F>(&self, handle: Arc<JobHandle>, task: F) -> RunnerResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.shared.sender.read();
        let Some(sender) = sender.as_ref() else {
            return Err(RunnerError::PoolShutdown);
        };
        sender
            .send((handle, Box::new(task)))
            .map_err(|_| RunnerError::PoolShutdown)
    }

    /// Stops accepting submissions; in-flight tasks still finish.
    /// Returns true only for the call that performed the shutdown.
    pub fn shutdown(&self) -> bool {
        self.shared.shutdown_with(|| {})
    }

    /// Returns true once the pool has been shut down
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.is_shutdown()
    }

    /// Control surface usable from inside tasks
    #[must_use]
    pub fn control(&self) -> PoolControl {
        PoolControl {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Completion signal shared by every handle run on this pool
    #[must_use]
    pub fn completion(&self) -> Arc<Completion> {
        Arc::clone(&self.shared.completion)
    }

    /// Number of worker threads
    #[must_use]
    pub fn size(&self) -> usize {
        self.config.size
    }

    /// Number of tasks currently executing
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.shutdown_with(|| {});
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("Worker thread terminated abnormally");
            }
        }
        debug!("Worker pool stopped");
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("active", &self.active_count())
            .field("shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}

fn run_worker(id: WorkerId, shared: &Shared, receiver: &Receiver<Envelope>) {
    debug!("Worker {} starting", id);

    // Ends once the sender is dropped and the channel is drained.
    for (handle, task) in receiver {
        let started = {
            let sender = shared.sender.read();
            if sender.is_none() {
                handle.withdraw();
                false
            } else {
                handle.begin()
            }
        };
        if !started {
            debug!(worker = %id, job = handle.index(), "Skipping withdrawn job");
            continue;
        }

        shared.active.fetch_add(1, Ordering::SeqCst);
        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            error!(worker = %id, job = handle.index(), "Task panicked");
        }
        handle.complete();
        shared.active.fetch_sub(1, Ordering::SeqCst);
    }

    debug!("Worker {} stopping", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::JobStatus;
    use std::time::Duration;

    fn handle_for(pool: &WorkerPool, index: usize) -> Arc<JobHandle> {
        Arc::new(JobHandle::new(index, format!("job-{index}"), pool.completion()))
    }

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.size, 10);
        assert_eq!(config.thread_name_prefix, "jobrunner");
        assert_eq!(config.stack_size, None);
    }

    #[test]
    fn test_worker_id_display() {
        let id = WorkerId(1);
        assert_eq!(id.to_string(), "worker-1");
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let pool = WorkerPool::with_size(0).unwrap();
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_runs_all_submitted_tasks() {
        let pool = WorkerPool::with_size(3).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..20).map(|i| handle_for(&pool, i)).collect();

        for handle in &handles {
            let counter = Arc::clone(&counter);
            pool.submit(Arc::clone(handle), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.completion().wait(handles.len());
        assert_eq!(counter.load(Ordering::SeqCst), 20);
        assert!(handles.iter().all(|h| h.status() == JobStatus::Completed));
    }

    #[test]
    fn test_concurrency_is_bounded() {
        let pool = WorkerPool::with_size(2).unwrap();
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8).map(|i| handle_for(&pool, i)).collect();

        for handle in &handles {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            pool.submit(Arc::clone(handle), move || {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                current.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.completion().wait(handles.len());
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let pool = WorkerPool::with_size(1).unwrap();
        assert!(pool.shutdown());
        assert!(pool.is_shutdown());

        let result = pool.submit(handle_for(&pool, 0), || {});
        assert_eq!(result, Err(RunnerError::PoolShutdown));
    }

    #[test]
    fn test_shutdown_is_idempotent_across_threads() {
        let pool = WorkerPool::with_size(1).unwrap();
        let winners = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let control = pool.control();
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    if control.shutdown() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(pool.completion().is_closed());
    }

    #[test]
    fn test_withdrawn_task_is_skipped() {
        let pool = WorkerPool::with_size(1).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        let blocker = handle_for(&pool, 0);
        let queued = handle_for(&pool, 1);

        pool.submit(Arc::clone(&blocker), || {
            thread::sleep(Duration::from_millis(50));
        })
        .unwrap();
        {
            let ran = Arc::clone(&ran);
            pool.submit(Arc::clone(&queued), move || {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        assert!(queued.withdraw());

        pool.completion().wait(2);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(queued.status(), JobStatus::Cancelled);
        assert_eq!(blocker.status(), JobStatus::Completed);
    }

    #[test]
    fn test_queued_task_is_withdrawn_at_shutdown() {
        let pool = WorkerPool::with_size(1).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        let blocker = handle_for(&pool, 0);
        let queued = handle_for(&pool, 1);

        pool.submit(Arc::clone(&blocker), || {
            thread::sleep(Duration::from_millis(50));
        })
        .unwrap();
        {
            let ran = Arc::clone(&ran);
            pool.submit(Arc::clone(&queued), move || {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        while blocker.status() != JobStatus::Running {
            thread::yield_now();
        }
        assert!(pool.shutdown());
        drop(pool);

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(queued.status(), JobStatus::Cancelled);
        assert_eq!(blocker.status(), JobStatus::Completed);
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let config = WorkerConfig::new(2).with_stack_size(1 << 60);
        match WorkerPool::new(config) {
            Err(RunnerError::WorkerSpawn { reason }) => assert!(!reason.is_empty()),
            other => panic!("expected a spawn failure, got {other:?}"),
        }
    }

    #[test]
    fn test_panicking_task_does_not_kill_worker() {
        let pool = WorkerPool::with_size(1).unwrap();
        let first = handle_for(&pool, 0);
        let second = handle_for(&pool, 1);

        pool.submit(Arc::clone(&first), || panic!("boom")).unwrap();
        pool.submit(Arc::clone(&second), || {}).unwrap();

        pool.completion().wait(2);
        assert_eq!(first.status(), JobStatus::Completed);
        assert_eq!(second.status(), JobStatus::Completed);
    }
}
