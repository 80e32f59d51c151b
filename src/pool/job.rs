use crate::{
    error::PoolError,
    sync::{Arc, Condvar, Mutex, lock, wait_until},
    utils::panic_message,
};
use std::panic::{self, AssertUnwindSafe};

/// A queued unit of work. Receives the index of the worker that runs it.
pub(crate) type Job = Box<dyn FnOnce(usize) + Send + 'static>;

struct JobState<R> {
    outcome: Mutex<Option<Result<R, PoolError>>>,
    finished: Condvar,
}

impl<R> JobState<R> {
    fn publish(&self, outcome: Result<R, PoolError>) {
        let mut slot = lock(&self.outcome);
        *slot = Some(outcome);
        self.finished.notify_all();
    }
}

/// Handle to the eventual result of a job pushed into a `WorkerPool`.
///
/// The handle resolves exactly once: to the callable's return value, to
/// `PoolError::Panicked` if it panicked, or to `PoolError::Cancelled` if the
/// job was discarded without running.
#[must_use = "dropping a JobHandle does not cancel the job, but its result is lost"]
pub struct JobHandle<R> {
    state: Arc<JobState<R>>,
}

impl<R> JobHandle<R> {
    /// Block until the job has run (or was discarded) and return its outcome.
    ///
    /// # Errors
    /// `PoolError::Panicked` if the callable panicked, `PoolError::Cancelled`
    /// if the job was dropped before running.
    pub fn wait(self) -> Result<R, PoolError> {
        let mut outcome = wait_until(&self.state.finished, lock(&self.state.outcome), |outcome| {
            outcome.is_some()
        });
        outcome.take().unwrap_or(Err(PoolError::Cancelled))
    }

    /// Whether the outcome is already available.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        lock(&self.state.outcome).is_some()
    }
}

impl<R> core::fmt::Debug for JobHandle<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JobHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Write side of a `JobHandle`. Resolves the handle to `Cancelled` when
/// dropped unused, so a job discarded from the queue never leaves its handle
/// waiting forever.
struct Completer<R> {
    state: Option<Arc<JobState<R>>>,
}

impl<R> Completer<R> {
    fn complete(mut self, outcome: Result<R, PoolError>) {
        if let Some(state) = self.state.take() {
            state.publish(outcome);
        }
    }
}

impl<R> Drop for Completer<R> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            state.publish(Err(PoolError::Cancelled));
        }
    }
}

/// Wrap `callable` into a single-shot job and the handle observing it.
pub(crate) fn package<F, R>(callable: F) -> (Job, JobHandle<R>)
where
    F: FnOnce(usize) -> R + Send + 'static,
    R: Send + 'static,
{
    let state = Arc::new(JobState {
        outcome: Mutex::new(None),
        finished: Condvar::new(),
    });
    let completer = Completer {
        state: Some(Arc::clone(&state)),
    };
    let job: Job = Box::new(move |worker| {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| callable(worker))).map_err(
            |payload| PoolError::Panicked {
                message: panic_message(&*payload),
            },
        );
        completer.complete(outcome);
    });
    (job, JobHandle { state })
}
