use crate::{
    graph::TaskGraph,
    types::{HashSet, IndexSet, NodeId},
};

impl TaskGraph {
    /// Whether the declared edges contain a directed cycle.
    ///
    /// `execute` on a cyclic graph never returns, so call this first on any
    /// structure that is not known to be acyclic.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// The nodes of one directed cycle, in edge order, or `None` for a DAG.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<NodeId>> {
        let cycle = find_cycle(self.nodes.len(), |index| {
            self.nodes[index].links.descendants.as_slice()
        })?;
        Some(cycle.into_iter().map(|index| self.node_id(index)).collect())
    }

    pub(crate) fn cycle_names(&self, cycle: &[NodeId]) -> Vec<String> {
        cycle
            .iter()
            .map(|id| self.nodes[id.index].cell.name().to_owned())
            .collect()
    }
}

/// Depth-first search over `len` vertices numbered `0..len`.
///
/// Keeps the current path in insertion order, so a back edge yields the
/// cycle directly. Vertices whose subtree is exhausted are never entered
/// again.
fn find_cycle<'a>(len: usize, children: impl Fn(usize) -> &'a [usize]) -> Option<Vec<usize>> {
    let mut finished = HashSet::default();
    let mut path = IndexSet::default();
    // (vertex, position of the next child to visit)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..len {
        if finished.contains(&root) {
            continue;
        }
        path.insert(root);
        stack.push((root, 0));

        while let Some(top) = stack.last_mut() {
            let (vertex, next) = *top;
            top.1 += 1;
            match children(vertex).get(next) {
                Some(&child) => {
                    if let Some(start) = path.get_index_of(&child) {
                        return Some(path.into_iter().skip(start).collect());
                    }
                    if !finished.contains(&child) {
                        path.insert(child);
                        stack.push((child, 0));
                    }
                }
                None => {
                    stack.pop();
                    path.pop();
                    finished.insert(vertex);
                }
            }
        }
    }
    None
}
