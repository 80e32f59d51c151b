use crate::types::NodeId;
use thiserror::Error;

/// Failure of a job pushed into a `WorkerPool`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The operating system refused to spawn a worker thread.
    #[error("failed to spawn worker thread")]
    Spawn(#[source] std::io::Error),
    /// The job was discarded before it ran: either by a hard stop or because
    /// it was pushed after the pool had shut down.
    #[error("job was cancelled before it ran")]
    Cancelled,
    /// The job's callable panicked.
    #[error("job panicked: {message}")]
    Panicked {
        /// Rendered panic payload.
        message: String,
    },
}

/// Failure recorded on a single node during execution.
///
/// A failed node still counts as completed: the graph's completion barrier
/// advances and children that only depend on its completion still run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NodeError {
    /// The node's callable panicked.
    #[error("callable panicked: {message}")]
    Panicked {
        /// Rendered panic payload.
        message: String,
    },
    /// A parent whose value this node consumes failed, so the callable was
    /// not run.
    #[error("upstream node `{parent}` failed")]
    UpstreamFailed {
        /// Name of the failed parent.
        parent: String,
    },
    /// The node's result cannot be duplicated but more than one child
    /// consumes it. The callable was not run.
    #[error("move-only result has {consumers} consumers, at most one is allowed")]
    MultipleConsumers {
        /// Number of registered result consumers.
        consumers: usize,
    },
    /// An argument slot was empty when the node ran.
    #[error("argument slot {slot} was never filled")]
    MissingInput {
        /// Zero-based argument position.
        slot: usize,
    },
}

/// Usage errors reported by `TaskGraph`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GraphError {
    /// The handle belongs to another graph, or was issued before `clear`.
    #[error("node {0} does not belong to this graph")]
    ForeignNode(NodeId),
    /// A node was declared as its own parent.
    #[error("node `{node}` cannot depend on itself")]
    SelfDependency {
        /// Name of the node.
        node: String,
    },
    /// The node is a task and produces no value.
    #[error("node `{node}` produces no value")]
    NoValue {
        /// Name of the node.
        node: String,
    },
    /// The node has not run since construction or the last `reset`.
    #[error("node `{node}` has no result yet")]
    NotExecuted {
        /// Name of the node.
        node: String,
    },
    /// The node's move-only result was already transferred out.
    #[error("result of node `{node}` was already consumed")]
    ValueConsumed {
        /// Name of the node.
        node: String,
    },
    /// The node ran and failed.
    #[error("node `{node}` failed")]
    NodeFailed {
        /// Name of the node.
        node: String,
        /// The recorded failure.
        #[source]
        source: NodeError,
    },
    /// A node with a move-only result has more than one result consumer.
    #[error("node `{node}` has a move-only result but {consumers} consumers")]
    MultipleConsumers {
        /// Name of the node.
        node: String,
        /// Number of registered result consumers.
        consumers: usize,
    },
    /// The graph contains a directed cycle (only reported when
    /// `GraphConfig::check_cycles` is enabled).
    #[error("graph contains a cycle: {}", path.join(" -> "))]
    Cycle {
        /// Names of the nodes on the cycle, in edge order.
        path: Vec<String>,
    },
    /// `execute` was called again without `reset`.
    #[error("graph was already executed; call `reset` first")]
    AlreadyExecuted,
    /// The graph's pool has no worker threads.
    #[error("worker pool has no threads")]
    NoWorkers,
    /// The graph's worker pool could not be built or resized.
    #[error(transparent)]
    Pool(#[from] PoolError),
}
