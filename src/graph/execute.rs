use crate::{
    error::{GraphError, NodeError},
    graph::TaskGraph,
    node::NodeCell,
    pool::PoolHandle,
    sync::{Arc, Condvar, Mutex, lock, wait_until},
};
use derive_more::Debug;
use tracing::{debug, error, trace};

/// Completion barrier: counts finished nodes and releases the thread blocked
/// in `execute` once all of them are done.
#[must_use]
#[derive(Debug)]
pub(crate) struct Completion {
    #[debug(skip)]
    completed: Mutex<usize>,
    #[debug(skip)]
    all_done: Condvar,
}

impl Completion {
    pub(crate) fn new() -> Self {
        Self {
            completed: Mutex::new(0),
            all_done: Condvar::new(),
        }
    }

    fn on_single_node_completed(&self) {
        *lock(&self.completed) += 1;
        self.all_done.notify_all();
    }

    fn wait_for(&self, total: usize) {
        let completed = lock(&self.completed);
        drop(wait_until(&self.all_done, completed, |completed| {
            *completed >= total
        }));
    }

    pub(crate) fn reset(&self) {
        *lock(&self.completed) = 0;
    }
}

/// Read-only snapshot of the graph shared with the workers for one
/// `execute` call.
struct Plan {
    nodes: Vec<PlannedNode>,
    pool: PoolHandle,
    completion: Arc<Completion>,
}

struct PlannedNode {
    cell: Arc<NodeCell>,
    /// Children to signal on completion: value consumers first, so their
    /// arguments are delivered before any completion-only child is queued.
    notify: Vec<usize>,
}

impl Plan {
    /// Queue the node on the worker pool.
    fn execute_single_node(self: &Arc<Self>, index: usize) {
        let plan = Arc::clone(self);
        trace!(node = self.nodes[index].cell.name(), "node dispatched");
        if !self.pool.spawn(move |worker| plan.run_node(index, worker)) {
            error!(
                node = self.nodes[index].cell.name(),
                "worker pool rejected a ready node"
            );
        }
    }

    fn run_node(self: Arc<Self>, index: usize, worker: usize) {
        let node = &self.nodes[index];
        if !node.cell.execute() {
            error!(node = node.cell.name(), "node dispatched twice");
            return;
        }
        trace!(node = node.cell.name(), worker, "node completed");
        for &child in &node.notify {
            self.on_argument_ready(child);
        }
        self.completion.on_single_node_completed();
    }

    /// One parent of `child` completed; dispatch the child if it was the
    /// last one.
    fn on_argument_ready(self: &Arc<Self>, child: usize) {
        let cell = &self.nodes[child].cell;
        match cell.on_argument_ready() {
            Some(0) => self.execute_single_node(child),
            Some(_) => {}
            None => error!(
                node = cell.name(),
                "readiness signal for a node with no pending parents"
            ),
        }
    }
}

impl TaskGraph {
    /// Run every node exactly once and block until all of them completed.
    ///
    /// Source nodes (no pending parents) are queued first; every other node
    /// is queued by the worker that completes its last parent. With a single
    /// worker, nodes run in exactly that readiness order.
    ///
    /// A node that fails (its callable panics, or a value it consumes is
    /// missing) still completes: its failure is recorded, see
    /// [`TaskGraph::failure`], and its completion-only children still run.
    ///
    /// Cycles are not detected unless `GraphConfig::check_cycles` is set; a
    /// cyclic graph makes this call block forever.
    ///
    /// # Errors
    /// - `GraphError::AlreadyExecuted` if the graph ran since the last
    ///   `reset`,
    /// - `GraphError::NoWorkers` if the pool has no threads,
    /// - `GraphError::Cycle` if cycle checks are enabled and one is found,
    /// - `GraphError::MultipleConsumers` if a move-only result has more than
    ///   one consumer. Nothing runs in that case.
    pub fn execute(&mut self) -> Result<(), GraphError> {
        if self.executed {
            return Err(GraphError::AlreadyExecuted);
        }
        if self.nodes.is_empty() {
            return Ok(());
        }
        if self.pool.size() == 0 {
            return Err(GraphError::NoWorkers);
        }
        if self.config.check_cycles {
            if let Some(cycle) = self.find_cycle() {
                return Err(GraphError::Cycle {
                    path: self.cycle_names(&cycle),
                });
            }
        }
        self.validate()?;

        let sources: Vec<_> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.cell.pending_count() == 0)
            .map(|(index, _)| index)
            .collect();
        let plan = Arc::new(Plan {
            nodes: self
                .nodes
                .iter()
                .map(|node| PlannedNode {
                    cell: Arc::clone(&node.cell),
                    notify: node
                        .links
                        .value_children
                        .iter()
                        .chain(&node.links.ready_children)
                        .copied()
                        .collect(),
                })
                .collect(),
            pool: self.pool.handle(),
            completion: Arc::clone(&self.completion),
        });
        self.executed = true;

        debug!(
            nodes = self.nodes.len(),
            sources = sources.len(),
            "graph execution started"
        );
        for index in sources {
            plan.execute_single_node(index);
        }
        self.completion.wait_for(self.nodes.len());
        debug!(
            failed = self.failed_nodes().len(),
            "graph execution finished"
        );
        Ok(())
    }

    fn validate(&self) -> Result<(), GraphError> {
        for node in &self.nodes {
            node.cell.validate().map_err(|source| {
                let node = node.cell.name().to_owned();
                match source {
                    NodeError::MultipleConsumers { consumers } => {
                        GraphError::MultipleConsumers { node, consumers }
                    }
                    source => GraphError::NodeFailed { node, source },
                }
            })?;
        }
        Ok(())
    }
}
