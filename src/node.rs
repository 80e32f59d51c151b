mod body;
mod inputs;
mod output;

pub(crate) use crate::node::{
    body::{Body, TaskBody, ValueBody},
    inputs::InputSlot,
    output::Output,
};
pub use crate::node::inputs::Inputs;
use crate::{
    error::NodeError,
    sync::{Arc, AtomicUsize, Mutex, Ordering, lock},
};
use derive_more::Debug;
use tracing::warn;

/// Execution state of a node within one `execute`/`reset` cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    /// Some parents have not signalled completion yet.
    Unscheduled,
    /// Every parent completed; the node is queued or about to be.
    Ready,
    /// A worker is running the node's callable.
    Running,
    /// The node ran (successfully or not) and notified its children.
    Completed,
}

const IDLE: usize = 0;
const RUNNING: usize = 1;
const COMPLETED: usize = 2;

/// Runtime state of one graph vertex, shared with the worker threads.
///
/// The graph owns every cell; the structural links between cells live in the
/// graph as plain indices.
#[must_use]
#[derive(Debug)]
pub(crate) struct NodeCell {
    name: Arc<str>,
    /// Parents that have not signalled completion yet.
    #[debug(skip)]
    pending: AtomicUsize,
    #[debug(skip)]
    phase: AtomicUsize,
    #[debug(skip)]
    body: Mutex<Box<dyn Body>>,
    #[debug(skip)]
    failure: Mutex<Option<NodeError>>,
}

impl NodeCell {
    pub(crate) fn new(name: Arc<str>, parents: usize, body: Box<dyn Body>) -> Self {
        Self {
            name,
            pending: AtomicUsize::new(parents),
            phase: AtomicUsize::new(IDLE),
            body: Mutex::new(body),
            failure: Mutex::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub(crate) fn status(&self) -> NodeStatus {
        match self.phase.load(Ordering::Acquire) {
            RUNNING => NodeStatus::Running,
            COMPLETED => NodeStatus::Completed,
            _ if self.pending_count() == 0 => NodeStatus::Ready,
            _ => NodeStatus::Unscheduled,
        }
    }

    /// Register one more parent. Only called while the graph is being built.
    pub(crate) fn add_parent(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    /// A parent completed. Returns the number of parents still pending, or
    /// `None` if the count was already zero (it is never decremented below
    /// zero).
    ///
    /// The decrement and the zero check are one atomic step, so among
    /// parents completing concurrently exactly one observes `Some(0)`.
    pub(crate) fn on_argument_ready(&self) -> Option<usize> {
        let mut current = self.pending.load(Ordering::Acquire);
        loop {
            let next = current.checked_sub(1)?;
            match self.pending.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Run the node's callable on the current thread.
    ///
    /// Returns `false` without running anything if the node already ran in
    /// this cycle. A failure is recorded on the node; the node still counts
    /// as completed.
    pub(crate) fn execute(&self) -> bool {
        if self
            .phase
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let outcome = lock(&self.body).run();
        if let Err(error) = outcome {
            warn!(node = %self.name, %error, "node failed");
            *lock(&self.failure) = Some(error);
        }
        self.phase.store(COMPLETED, Ordering::Release);
        true
    }

    pub(crate) fn validate(&self) -> Result<(), NodeError> {
        lock(&self.body).validate()
    }

    pub(crate) fn failure(&self) -> Option<NodeError> {
        lock(&self.failure).clone()
    }

    pub(crate) fn with_body<R>(&self, f: impl FnOnce(&mut Box<dyn Body>) -> R) -> R {
        f(&mut *lock(&self.body))
    }

    /// Clear results and failures and re-arm the pending count.
    pub(crate) fn reset(&self, parents: usize) {
        lock(&self.body).reset();
        *lock(&self.failure) = None;
        self.pending.store(parents, Ordering::Release);
        self.phase.store(IDLE, Ordering::Release);
    }
}
