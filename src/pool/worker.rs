use crate::{
    error::PoolError,
    pool::{PoolShared, PoolState, job::Job},
    sync::{Arc, AtomicBool, Ordering, lock, thread, wait_until},
    utils::panic_message,
};
use derive_more::Debug;
use std::panic::{self, AssertUnwindSafe};
use tracing::{trace, warn};

/// Bookkeeping for one worker thread.
#[must_use]
#[derive(Debug)]
pub(super) struct Worker {
    index: usize,
    /// Set to make this worker return after its current job.
    #[debug(skip)]
    stop: Arc<AtomicBool>,
    #[debug(skip)]
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    pub(super) fn spawn(
        index: usize,
        name: String,
        shared: Arc<PoolShared>,
    ) -> Result<Self, PoolError> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || run(index, &shared, &flag))
            .map_err(PoolError::Spawn)?;
        Ok(Self {
            index,
            stop,
            thread: Some(thread),
        })
    }

    pub(super) fn signal_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Signal the worker to stop and forget its thread without waiting.
    pub(super) fn detach(mut self) {
        self.signal_stop();
        drop(self.thread.take());
    }

    pub(super) fn join(mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.join().is_err() {
            warn!(worker = self.index, "worker thread terminated by a panic");
        }
    }
}

/// Worker loop: drain the queue, park when it is empty, return when the
/// worker's stop flag is set or the pool shuts down with nothing left to pop.
fn run(index: usize, shared: &PoolShared, stop: &AtomicBool) {
    trace!(worker = index, "worker started");
    let mut next = None;
    loop {
        while let Some(job) = next.take() {
            run_job(index, job);
            if stop.load(Ordering::Acquire) {
                trace!(worker = index, "worker stopped");
                return;
            }
            next = shared.queue.pop();
        }

        // The predicate pops under the pool lock and every producer notifies
        // under the same lock, so a push can't slip between check and park.
        let state = lock(&shared.state);
        shared.idle.fetch_add(1, Ordering::Relaxed);
        trace!(worker = index, "worker parked");
        let state = wait_until(&shared.wakeup, state, |state| {
            if *state == PoolState::Halted || stop.load(Ordering::Acquire) {
                return true;
            }
            next = shared.queue.pop();
            next.is_some() || *state == PoolState::Draining
        });
        shared.idle.fetch_sub(1, Ordering::Relaxed);
        drop(state);

        if next.is_none() {
            trace!(worker = index, "worker exited");
            return;
        }
    }
}

/// Run one job. The job box is consumed by the call, so it is released
/// exactly once whether the callable returns or unwinds.
fn run_job(index: usize, job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || job(index))) {
        warn!(
            worker = index,
            message = %panic_message(&*payload),
            "job panicked outside of a job handle"
        );
    }
}
