use core::{
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};
use derive_more::Display;
use indexmap::IndexSet as _IndexSet;
use rustc_hash::FxBuildHasher;
use std::{
    collections::HashSet as _HashSet,
    sync::atomic::{AtomicU64, Ordering},
};

/// Identity of one `TaskGraph` generation.
///
/// A fresh id is drawn on construction and on every `TaskGraph::clear`, so
/// handles minted before a `clear` (or by another graph) never resolve.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct GraphId(u64);

impl GraphId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Untyped identifier of a node, stable for the lifetime of its graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display)]
#[display("#{index}")]
pub struct NodeId {
    pub(crate) graph: GraphId,
    pub(crate) index: usize,
}

impl NodeId {
    /// Position of the node in its graph's creation order.
    #[must_use]
    pub fn index(self) -> usize {
        self.index
    }
}

/// Non-owning, typed reference to a node owned by a `TaskGraph`.
///
/// `T` is the node's result type (`()` for tasks that produce no value). The
/// handle is a plain index: it is `Copy`, can be sent across threads and
/// never keeps the node alive.
pub struct NodeHandle<T> {
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> NodeHandle<T> {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The untyped id of the referenced node.
    #[must_use]
    pub fn id(self) -> NodeId {
        self.id
    }
}

impl<T> Clone for NodeHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeHandle<T> {}

impl<T> PartialEq for NodeHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for NodeHandle<T> {}

impl<T> Hash for NodeHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for NodeHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeHandle").field(&self.id).finish()
    }
}

pub(crate) type HashSet<T> = _HashSet<T, FxBuildHasher>;
pub(crate) type IndexSet<T> = _IndexSet<T, FxBuildHasher>;
