mod job;
mod queue;
mod worker;

pub use crate::pool::job::JobHandle;
use crate::{
    config::PoolConfig,
    error::PoolError,
    pool::{
        job::{Job, package},
        queue::WorkQueue,
        worker::Worker,
    },
    sync::{Arc, AtomicUsize, Condvar, Mutex, Ordering, lock},
};
use core::fmt;
use derive_more::Debug;
use tracing::{debug, info};

/// How `WorkerPool::stop` treats work that is still queued.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Shutdown {
    /// Let the workers drain the queue, then join them.
    Drain,
    /// Discard every queued job without running it, let jobs that already
    /// started finish, then join the workers.
    Abandon,
}

/// Lifecycle of a pool. Only moves forward.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum PoolState {
    Running,
    /// Graceful stop in progress: workers exit once the queue is empty.
    Draining,
    /// Stopped; pushes are rejected.
    Halted,
}

/// State shared between the pool owner, its workers and any producer.
#[must_use]
#[derive(Debug)]
pub(crate) struct PoolShared {
    queue: WorkQueue<Job>,
    /// Guards the lifecycle and is the lock parked workers wait on.
    #[debug(skip)]
    state: Mutex<PoolState>,
    #[debug(skip)]
    wakeup: Condvar,
    #[debug(skip)]
    idle: AtomicUsize,
}

impl PoolShared {
    fn new() -> Self {
        Self {
            queue: WorkQueue::new(),
            state: Mutex::new(PoolState::Running),
            wakeup: Condvar::new(),
            idle: AtomicUsize::new(0),
        }
    }

    /// Enqueue `job` and wake one parked worker.
    ///
    /// Returns `false` and drops the job if the pool has halted. Draining
    /// pools still accept work, so jobs may keep spawning follow-up jobs while
    /// the queue drains.
    fn submit(&self, job: Job) -> bool {
        let state = lock(&self.state);
        if *state == PoolState::Halted {
            drop(state);
            debug!("job rejected: worker pool has shut down");
            drop(job);
            return false;
        }
        self.queue.push(job);
        self.wakeup.notify_one();
        true
    }

    fn wake_all(&self) {
        let _state = lock(&self.state);
        self.wakeup.notify_all();
    }

    fn clear_queue(&self) -> usize {
        if self.queue.is_empty() {
            return 0;
        }
        let mut discarded = 0;
        while let Some(job) = self.queue.pop() {
            drop(job);
            discarded += 1;
        }
        discarded
    }
}

/// Cloneable producer side of a pool, used by the task graph to dispatch
/// nodes from worker threads.
#[derive(Debug, Clone)]
pub(crate) struct PoolHandle {
    shared: Arc<PoolShared>,
}

impl PoolHandle {
    pub(crate) fn spawn(&self, job: impl FnOnce(usize) + Send + 'static) -> bool {
        self.shared.submit(Box::new(job))
    }
}

/// A resizable set of worker threads pulling jobs from one shared FIFO.
///
/// Every job receives the index of the worker running it. Dropping the pool
/// performs a `Shutdown::Drain` stop.
pub struct WorkerPool {
    config: PoolConfig,
    shared: Arc<PoolShared>,
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Spawn a pool of `workers` threads with default naming.
    ///
    /// # Errors
    /// `PoolError::Spawn` if a thread could not be created.
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        Self::with_config(PoolConfig::with_workers(workers))
    }

    /// Spawn a pool described by `config`.
    ///
    /// # Errors
    /// `PoolError::Spawn` if a thread could not be created.
    pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
        let workers = config.workers;
        let mut pool = Self {
            config,
            shared: Arc::new(PoolShared::new()),
            workers: Vec::with_capacity(workers),
        };
        pool.grow(workers)?;
        info!(workers, "worker pool started");
        Ok(pool)
    }

    /// Number of worker threads currently owned by the pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Number of workers parked waiting for work.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.shared.idle.load(Ordering::Relaxed)
    }

    /// Approximate number of queued jobs not yet picked up by a worker.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// Whether the pool still accepts and runs jobs.
    #[must_use]
    pub fn is_running(&self) -> bool {
        *lock(&self.shared.state) == PoolState::Running
    }

    /// Change the number of worker threads.
    ///
    /// Growing spawns new workers. Shrinking tells the excess workers to exit
    /// after their current job and detaches them without waiting. Does
    /// nothing once the pool has been stopped.
    ///
    /// # Errors
    /// `PoolError::Spawn` if a new thread could not be created; workers
    /// spawned before the failure are kept.
    pub fn resize(&mut self, workers: usize) -> Result<(), PoolError> {
        if !self.is_running() {
            debug!(workers, "resize ignored: worker pool has shut down");
            return Ok(());
        }
        let previous = self.workers.len();
        if workers >= previous {
            self.grow(workers)?;
        } else {
            for worker in self.workers.drain(workers..) {
                worker.detach();
            }
            self.shared.wake_all();
        }
        info!(from = previous, to = workers, "worker pool resized");
        Ok(())
    }

    fn grow(&mut self, workers: usize) -> Result<(), PoolError> {
        for index in self.workers.len()..workers {
            let worker = Worker::spawn(
                index,
                self.config.thread_name(index),
                Arc::clone(&self.shared),
            )?;
            self.workers.push(worker);
        }
        Ok(())
    }

    /// Queue `job` and return a handle to its result.
    ///
    /// If the pool has already stopped the job is dropped and the handle
    /// resolves to `PoolError::Cancelled`.
    pub fn push<F, R>(&self, job: F) -> JobHandle<R>
    where
        F: FnOnce(usize) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (job, handle) = package(job);
        self.shared.submit(job);
        handle
    }

    /// Queue `job` bound to `args`; see [`WorkerPool::push`].
    pub fn push_with<F, A, R>(&self, job: F, args: A) -> JobHandle<R>
    where
        F: FnOnce(usize, A) -> R + Send + 'static,
        A: Send + 'static,
        R: Send + 'static,
    {
        self.push(move |worker| job(worker, args))
    }

    /// Discard every queued job without running it. Returns how many were
    /// discarded; their handles resolve to `PoolError::Cancelled`.
    pub fn clear_queue(&self) -> usize {
        self.shared.clear_queue()
    }

    /// Stop the pool and join every worker thread.
    ///
    /// Idempotent: only the first call has an effect. Afterwards `push`
    /// rejects new jobs and `resize` does nothing.
    pub fn stop(&mut self, mode: Shutdown) {
        {
            let mut state = lock(&self.shared.state);
            if *state != PoolState::Running {
                return;
            }
            match mode {
                Shutdown::Drain => *state = PoolState::Draining,
                Shutdown::Abandon => {
                    *state = PoolState::Halted;
                    for worker in &self.workers {
                        worker.signal_stop();
                    }
                }
            }
        }
        if mode == Shutdown::Abandon {
            let discarded = self.shared.clear_queue();
            debug!(discarded, "queued jobs abandoned");
        }
        self.shared.wake_all();

        for worker in self.workers.drain(..) {
            worker.join();
        }
        self.shared.clear_queue();
        *lock(&self.shared.state) = PoolState::Halted;
        info!(?mode, "worker pool stopped");
    }

    pub(crate) fn handle(&self) -> PoolHandle {
        PoolHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop(Shutdown::Drain);
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("size", &self.size())
            .field("idle", &self.idle_count())
            .field("queued", &self.queued())
            .finish()
    }
}
