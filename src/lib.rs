//! Concurrent task-graph executor backed by a resizable worker pool.
//!
//! Callers declare units of work as nodes of a [`TaskGraph`](graph::TaskGraph),
//! wire them into a directed dependency graph and call `execute`. Every node
//! runs exactly once, as soon as all of its parents completed, on one of the
//! graph's worker threads; `execute` returns once the last node is done.
//!
//! - Readiness is tracked with one atomic pending-parent counter per node.
//!   The decrement and the zero check are a single atomic step, so a node
//!   with several parents completing at once is dispatched exactly once.
//! - Edges either carry only completion (`set_parent`) or a value: parents
//!   bound to a node's arguments at creation hand their result over directly
//!   (`make_node_with`).
//! - Duplicable results (`make_node`, `T: Clone`) are cloned to every
//!   consumer; move-only results (`make_unique_node`) are moved into their
//!   single consumer, and `execute` refuses to start if a move-only result
//!   has more than one.
//! - A panicking callable fails only its own node: the failure is recorded,
//!   value consumers fail with `NodeError::UpstreamFailed`, and the graph
//!   still completes.
//!
//! Quick start:
//! 1. Create a graph with `TaskGraph::new(workers)`.
//! 2. Add nodes with `make_node`, `make_unique_node` or `make_task`, binding
//!    inputs through their `_with` variants.
//! 3. Declare extra ordering with `set_parent`, optionally check
//!    `has_cycle`, then `execute` and read results with `value`.
//! 4. `reset` to run the same structure again.
//!
//! The [`WorkerPool`](pool::WorkerPool) is usable on its own as a plain FIFO
//! thread pool with graceful and hard shutdown.

/// Construction-time settings for pools and graphs.
///
/// Exposes `PoolConfig` (worker count and thread naming) and `GraphConfig`
/// (pool settings plus optional cycle checks in `execute`).
pub mod config;
/// Error types returned by the pool and the graph.
pub mod error;
/// The task graph: node ownership, dependency wiring, cycle detection and
/// the dispatch-on-ready execution loop with its completion barrier.
pub mod graph;
/// Per-node state: pending-parent counting, argument slots, result storage
/// and single- vs multi-consumer result hand-off.
pub mod node;
/// A resizable pool of worker threads draining a shared FIFO of jobs.
///
/// Supports draining and abandoning shutdown, dynamic resize and per-job
/// result handles.
pub mod pool;
mod sync;
/// Node ids and typed node handles.
pub mod types;
mod utils;
