use crate::{
    error::{GraphError, NodeError},
    graph::TaskGraph,
    sync::{Arc, Mutex, lock},
    types::{NodeHandle, NodeId},
};

/// One argument position of a node, filled by the parent that produces it.
///
/// Written once by the parent's worker thread before it signals readiness,
/// read once by the child's worker thread after its pending count reached
/// zero.
#[doc(hidden)]
pub struct InputSlot<T> {
    value: Mutex<Option<Result<T, NodeError>>>,
}

impl<T> InputSlot<T> {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    pub(crate) fn deliver(&self, value: Result<T, NodeError>) {
        *lock(&self.value) = Some(value);
    }

    fn take(&self, slot: usize) -> Result<T, NodeError> {
        lock(&self.value)
            .take()
            .unwrap_or(Err(NodeError::MissingInput { slot }))
    }

    fn clear(&self) {
        *lock(&self.value) = None;
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Parents whose values are bound, in order, to a node's arguments.
///
/// Implemented for `()` and for tuples of one to four [`NodeHandle`]s. The
/// callable of a node built with `TaskGraph::make_node_with` receives
/// `Self::Values`, the tuple of the parents' results.
pub trait Inputs: sealed::Sealed + Send + 'static {
    /// Tuple of argument values handed to the node's callable.
    type Values;

    #[doc(hidden)]
    type Slots: Send + 'static;

    #[doc(hidden)]
    fn parents(&self) -> Vec<NodeId>;

    #[doc(hidden)]
    fn slots() -> Self::Slots;

    #[doc(hidden)]
    fn check(&self, graph: &TaskGraph) -> Result<(), GraphError>;

    #[doc(hidden)]
    fn connect(
        &self,
        graph: &mut TaskGraph,
        child: NodeId,
        slots: &Self::Slots,
    ) -> Result<(), GraphError>;

    #[doc(hidden)]
    fn take(slots: &Self::Slots) -> Result<Self::Values, NodeError>;

    #[doc(hidden)]
    fn clear(slots: &Self::Slots);
}

impl sealed::Sealed for () {}

impl Inputs for () {
    type Values = ();
    type Slots = ();

    fn parents(&self) -> Vec<NodeId> {
        Vec::new()
    }

    fn slots() -> Self::Slots {}

    fn check(&self, _graph: &TaskGraph) -> Result<(), GraphError> {
        Ok(())
    }

    fn connect(
        &self,
        _graph: &mut TaskGraph,
        _child: NodeId,
        _slots: &Self::Slots,
    ) -> Result<(), GraphError> {
        Ok(())
    }

    fn take(_slots: &Self::Slots) -> Result<Self::Values, NodeError> {
        Ok(())
    }

    fn clear(_slots: &Self::Slots) {}
}

macro_rules! impl_inputs {
    ($($T:ident $idx:tt),+) => {
        impl<$($T: Send + 'static),+> sealed::Sealed for ($(NodeHandle<$T>,)+) {}

        impl<$($T: Send + 'static),+> Inputs for ($(NodeHandle<$T>,)+) {
            type Values = ($($T,)+);
            type Slots = ($(Arc<InputSlot<$T>>,)+);

            fn parents(&self) -> Vec<NodeId> {
                vec![$(self.$idx.id()),+]
            }

            fn slots() -> Self::Slots {
                ($(Arc::new(InputSlot::<$T>::new()),)+)
            }

            fn check(&self, graph: &TaskGraph) -> Result<(), GraphError> {
                $(graph.check_value_input(self.$idx)?;)+
                Ok(())
            }

            fn connect(
                &self,
                graph: &mut TaskGraph,
                child: NodeId,
                slots: &Self::Slots,
            ) -> Result<(), GraphError> {
                $(graph.bind_consumer(self.$idx, child, Arc::clone(&slots.$idx))?;)+
                Ok(())
            }

            fn take(slots: &Self::Slots) -> Result<Self::Values, NodeError> {
                Ok(($(slots.$idx.take($idx)?,)+))
            }

            fn clear(slots: &Self::Slots) {
                $(slots.$idx.clear();)+
            }
        }
    };
}

impl_inputs!(A 0);
impl_inputs!(A 0, B 1);
impl_inputs!(A 0, B 1, C 2);
impl_inputs!(A 0, B 1, C 2, D 3);
