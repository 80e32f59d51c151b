mod build;
mod cycle;
mod execute;

use crate::{
    config::GraphConfig,
    error::{GraphError, NodeError},
    graph::execute::Completion,
    node::{NodeCell, NodeStatus, Output},
    pool::WorkerPool,
    sync::Arc,
    types::{GraphId, NodeHandle, NodeId},
};
use tracing::debug;

/// Owner of a set of task nodes, their dependency edges and the worker pool
/// that runs them.
///
/// Nodes are created through the graph (`make_node`, `make_task`, ...) and
/// referenced through `Copy` [`NodeHandle`]s. Edges are declared with
/// [`TaskGraph::set_parent`] (completion only) or by binding parents to a
/// node's arguments at creation (`make_node_with`). [`TaskGraph::execute`]
/// runs every node exactly once, each as soon as all of its parents
/// completed, and blocks until the last one is done.
///
/// The graph does not reject cycles on its own: a cyclic graph blocks
/// `execute` forever unless `GraphConfig::check_cycles` is set. Use
/// [`TaskGraph::has_cycle`] before executing untrusted structures.
pub struct TaskGraph {
    id: GraphId,
    config: GraphConfig,
    nodes: Vec<GraphNode>,
    completion: Arc<Completion>,
    executed: bool,
    pool: WorkerPool,
}

/// A node owned by the graph: its runtime cell plus the structural links,
/// which only change while the graph is being built.
#[derive(Debug)]
struct GraphNode {
    cell: Arc<NodeCell>,
    links: NodeLinks,
}

#[derive(Debug, Default)]
struct NodeLinks {
    /// Declared parents, including bound arguments. Restored on `reset`.
    parents_total: usize,
    /// Every child in declaration order, for cycle detection and diagnostics.
    descendants: Vec<usize>,
    /// Children consuming this node's value, in binding order.
    value_children: Vec<usize>,
    /// Children depending on this node's completion only, in declaration
    /// order.
    ready_children: Vec<usize>,
}

impl TaskGraph {
    /// Create an empty graph backed by `workers` threads.
    ///
    /// # Errors
    /// `GraphError::Pool` if a worker thread could not be spawned.
    pub fn new(workers: usize) -> Result<Self, GraphError> {
        Self::with_config(GraphConfig::with_workers(workers))
    }

    /// Create an empty graph described by `config`.
    ///
    /// # Errors
    /// `GraphError::Pool` if a worker thread could not be spawned.
    pub fn with_config(config: GraphConfig) -> Result<Self, GraphError> {
        let pool = WorkerPool::with_config(config.pool.clone())?;
        Ok(Self {
            id: GraphId::next(),
            config,
            nodes: Vec::new(),
            completion: Arc::new(Completion::new()),
            executed: false,
            pool,
        })
    }

    /// Number of owned nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph owns no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of every owned node, in creation order.
    pub fn node_ids(&self) -> impl ExactSizeIterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|index| self.node_id(index))
    }

    /// The worker pool executing this graph.
    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Resize the worker pool. Must not be called while `execute` runs.
    ///
    /// # Errors
    /// `GraphError::Pool` if a new worker thread could not be spawned.
    pub fn resize_pool(&mut self, workers: usize) -> Result<(), GraphError> {
        self.pool.resize(workers)?;
        Ok(())
    }

    /// Human-readable name the node was created with.
    ///
    /// # Errors
    /// `GraphError::ForeignNode` if the handle does not belong to this graph.
    pub fn name<T>(&self, node: NodeHandle<T>) -> Result<&str, GraphError> {
        Ok(self.node(node.id())?.cell.name())
    }

    /// Number of parents that have not signalled completion yet; zero means
    /// the node is ready to run.
    ///
    /// # Errors
    /// `GraphError::ForeignNode` if the handle does not belong to this graph.
    pub fn pending_count<T>(&self, node: NodeHandle<T>) -> Result<usize, GraphError> {
        Ok(self.node(node.id())?.cell.pending_count())
    }

    /// Execution state of the node in the current cycle.
    ///
    /// # Errors
    /// `GraphError::ForeignNode` if the handle does not belong to this graph.
    pub fn status<T>(&self, node: NodeHandle<T>) -> Result<NodeStatus, GraphError> {
        Ok(self.node(node.id())?.cell.status())
    }

    /// Children of the node, in the order the edges were declared.
    ///
    /// # Errors
    /// `GraphError::ForeignNode` if the handle does not belong to this graph.
    pub fn descendants<T>(&self, node: NodeHandle<T>) -> Result<Vec<NodeId>, GraphError> {
        let node = self.node(node.id())?;
        Ok(node
            .links
            .descendants
            .iter()
            .map(|&index| self.node_id(index))
            .collect())
    }

    /// Failure recorded on the node during the last execution, if any.
    ///
    /// # Errors
    /// `GraphError::ForeignNode` if the handle does not belong to this graph.
    pub fn failure<T>(&self, node: NodeHandle<T>) -> Result<Option<NodeError>, GraphError> {
        Ok(self.node(node.id())?.cell.failure())
    }

    /// Every node that failed during the last execution.
    #[must_use]
    pub fn failed_nodes(&self) -> Vec<(NodeId, NodeError)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| Some((self.node_id(index), node.cell.failure()?)))
            .collect()
    }

    /// The node's result.
    ///
    /// Duplicable results are copied out and stay retrievable. Move-only
    /// results are transferred: after a successful call, or after the value
    /// was handed to its consuming child, further calls fail with
    /// `GraphError::ValueConsumed`.
    ///
    /// # Errors
    /// - `GraphError::NodeFailed` if the node failed,
    /// - `GraphError::NoValue` for tasks,
    /// - `GraphError::NotExecuted` before the node ran,
    /// - `GraphError::ValueConsumed` if a move-only value is gone,
    /// - `GraphError::ForeignNode` for handles of another graph.
    pub fn value<T: 'static>(&self, node: NodeHandle<T>) -> Result<T, GraphError> {
        let cell = &self.node(node.id())?.cell;
        let name = || cell.name().to_owned();
        if let Some(source) = cell.failure() {
            return Err(GraphError::NodeFailed {
                node: name(),
                source,
            });
        }
        cell.with_body(|body| {
            let Some(output) = body
                .output_mut()
                .and_then(|output| output.downcast_mut::<Output<T>>())
            else {
                return Err(GraphError::NoValue { node: name() });
            };
            output.retrieve().ok_or_else(|| {
                if output.was_transferred() {
                    GraphError::ValueConsumed { node: name() }
                } else {
                    GraphError::NotExecuted { node: name() }
                }
            })
        })
    }

    /// Clear every result and failure and restore every pending count, so
    /// the same structure can be executed again.
    pub fn reset(&mut self) {
        for node in &self.nodes {
            node.cell.reset(node.links.parents_total);
        }
        self.completion.reset();
        self.executed = false;
        debug!(nodes = self.nodes.len(), "graph reset");
    }

    /// Destroy every node. Handles issued before the call no longer resolve.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.id = GraphId::next();
        self.completion.reset();
        self.executed = false;
    }

    fn node_id(&self, index: usize) -> NodeId {
        NodeId {
            graph: self.id,
            index,
        }
    }

    fn index_of(&self, id: NodeId) -> Result<usize, GraphError> {
        if id.graph != self.id || id.index >= self.nodes.len() {
            return Err(GraphError::ForeignNode(id));
        }
        Ok(id.index)
    }

    fn node(&self, id: NodeId) -> Result<&GraphNode, GraphError> {
        let index = self.index_of(id)?;
        Ok(&self.nodes[index])
    }
}

impl core::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("nodes", &self.nodes.len())
            .field("executed", &self.executed)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
