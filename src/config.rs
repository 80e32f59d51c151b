/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads spawned on construction.
    ///
    /// Zero is allowed for a standalone pool (jobs queue up until it is
    /// resized), but a `TaskGraph` refuses to execute without workers.
    pub workers: usize,
    /// Prefix of worker thread names; thread `i` is named `"{prefix}-{i}"`.
    pub thread_name: String,
}

impl PoolConfig {
    /// Default configuration with `workers` threads.
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub(crate) fn thread_name(&self, index: usize) -> String {
        format!("{}-{index}", self.thread_name)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            thread_name: "taskgraph-worker".to_owned(),
        }
    }
}

/// Task graph configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphConfig {
    /// Configuration of the graph's private worker pool.
    ///
    /// The default single worker runs nodes strictly in readiness order.
    pub pool: PoolConfig,
    /// Run cycle detection at the start of every `execute` and fail with
    /// `GraphError::Cycle` instead of blocking forever.
    ///
    /// Off by default: cycle detection is otherwise the caller's job, via
    /// `TaskGraph::has_cycle`.
    pub check_cycles: bool,
}

impl GraphConfig {
    /// Default configuration with a pool of `workers` threads.
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            pool: PoolConfig::with_workers(workers),
            ..Self::default()
        }
    }
}
