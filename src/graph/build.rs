use crate::{
    error::GraphError,
    graph::{GraphNode, NodeLinks, TaskGraph},
    node::{Body, InputSlot, Inputs, NodeCell, Output, TaskBody, ValueBody},
    sync::Arc,
    types::{NodeHandle, NodeId},
};

impl TaskGraph {
    /// Add a source node whose result is cloned to every consumer and kept
    /// for [`TaskGraph::value`].
    pub fn make_node<T, F>(&mut self, name: impl Into<Arc<str>>, mut callable: F) -> NodeHandle<T>
    where
        T: Clone + Send + 'static,
        F: FnMut() -> T + Send + 'static,
    {
        let name = name.into();
        let output = Output::duplicable(Arc::clone(&name));
        let body = ValueBody::<(), _, T>::new(move |()| callable(), (), output);
        NodeHandle::new(self.insert(name, 0, Box::new(body)))
    }

    /// Add a node computing its result from the values of `inputs`.
    ///
    /// Each parent in `inputs` becomes a result-consuming parent of the new
    /// node: the node runs after all of them completed and receives their
    /// values as a tuple, in order.
    ///
    /// # Errors
    /// - `GraphError::ForeignNode` if a parent belongs to another graph,
    /// - `GraphError::NoValue` if a parent is a task.
    pub fn make_node_with<I, T, F>(
        &mut self,
        name: impl Into<Arc<str>>,
        inputs: I,
        callable: F,
    ) -> Result<NodeHandle<T>, GraphError>
    where
        I: Inputs,
        T: Clone + Send + 'static,
        F: FnMut(I::Values) -> T + Send + 'static,
    {
        let id = self.wire(name.into(), &inputs, |name, slots| {
            Box::new(ValueBody::<I, _, T>::new(
                callable,
                slots,
                Output::duplicable(name),
            ))
        })?;
        Ok(NodeHandle::new(id))
    }

    /// Add a source node whose result cannot be duplicated.
    ///
    /// The result is moved into its single consumer, or, without a consumer,
    /// kept until taken out with [`TaskGraph::value`]. Registering a second
    /// consumer makes `execute` fail with `GraphError::MultipleConsumers`.
    pub fn make_unique_node<T, F>(
        &mut self,
        name: impl Into<Arc<str>>,
        mut callable: F,
    ) -> NodeHandle<T>
    where
        T: Send + 'static,
        F: FnMut() -> T + Send + 'static,
    {
        let name = name.into();
        let output = Output::move_only(Arc::clone(&name));
        let body = ValueBody::<(), _, T>::new(move |()| callable(), (), output);
        NodeHandle::new(self.insert(name, 0, Box::new(body)))
    }

    /// Move-only counterpart of [`TaskGraph::make_node_with`].
    ///
    /// # Errors
    /// See [`TaskGraph::make_node_with`].
    pub fn make_unique_node_with<I, T, F>(
        &mut self,
        name: impl Into<Arc<str>>,
        inputs: I,
        callable: F,
    ) -> Result<NodeHandle<T>, GraphError>
    where
        I: Inputs,
        T: Send + 'static,
        F: FnMut(I::Values) -> T + Send + 'static,
    {
        let id = self.wire(name.into(), &inputs, |name, slots| {
            Box::new(ValueBody::<I, _, T>::new(
                callable,
                slots,
                Output::move_only(name),
            ))
        })?;
        Ok(NodeHandle::new(id))
    }

    /// Add a source node that produces no value.
    pub fn make_task<F>(&mut self, name: impl Into<Arc<str>>, mut callable: F) -> NodeHandle<()>
    where
        F: FnMut() + Send + 'static,
    {
        let body = TaskBody::<(), _>::new(move |()| callable(), ());
        NodeHandle::new(self.insert(name.into(), 0, Box::new(body)))
    }

    /// Add a node that produces no value but consumes the values of
    /// `inputs`.
    ///
    /// # Errors
    /// See [`TaskGraph::make_node_with`].
    pub fn make_task_with<I, F>(
        &mut self,
        name: impl Into<Arc<str>>,
        inputs: I,
        callable: F,
    ) -> Result<NodeHandle<()>, GraphError>
    where
        I: Inputs,
        F: FnMut(I::Values) + Send + 'static,
    {
        let id = self.wire(name.into(), &inputs, |_, slots| {
            Box::new(TaskBody::<I, _>::new(callable, slots))
        })?;
        Ok(NodeHandle::new(id))
    }

    /// Declare that `child` may only run after `parent` completed.
    ///
    /// The edge carries no value. Declaring the same edge twice makes the
    /// child wait for two signals from the parent, which it receives.
    ///
    /// # Errors
    /// - `GraphError::ForeignNode` if either node belongs to another graph,
    /// - `GraphError::SelfDependency` if `child` and `parent` are the same
    ///   node.
    pub fn set_parent<C, P>(
        &mut self,
        child: NodeHandle<C>,
        parent: NodeHandle<P>,
    ) -> Result<(), GraphError> {
        let child = self.index_of(child.id())?;
        let parent = self.index_of(parent.id())?;
        if child == parent {
            return Err(GraphError::SelfDependency {
                node: self.nodes[child].cell.name().to_owned(),
            });
        }
        let links = &mut self.nodes[parent].links;
        links.descendants.push(child);
        links.ready_children.push(child);

        let child = &mut self.nodes[child];
        child.links.parents_total += 1;
        child.cell.add_parent();
        Ok(())
    }

    /// `parent` must be a value-producing node of this graph with result
    /// type `T`.
    pub(crate) fn check_value_input<T: 'static>(
        &self,
        parent: NodeHandle<T>,
    ) -> Result<(), GraphError> {
        let cell = &self.node(parent.id())?.cell;
        let produces_value = cell.with_body(|body| {
            body.output_mut()
                .is_some_and(|output| output.is::<Output<T>>())
        });
        if produces_value {
            Ok(())
        } else {
            Err(GraphError::NoValue {
                node: cell.name().to_owned(),
            })
        }
    }

    /// Register `slot` of `child` as a consumer of `parent`'s result.
    pub(crate) fn bind_consumer<T: 'static>(
        &mut self,
        parent: NodeHandle<T>,
        child: NodeId,
        slot: Arc<InputSlot<T>>,
    ) -> Result<(), GraphError> {
        let parent = self.index_of(parent.id())?;
        let GraphNode { cell, links } = &mut self.nodes[parent];
        cell.with_body(|body| {
            let output = body
                .output_mut()
                .and_then(|output| output.downcast_mut::<Output<T>>())
                .ok_or_else(|| GraphError::NoValue {
                    node: cell.name().to_owned(),
                })?;
            output.add_consumer(slot);
            Ok::<_, GraphError>(())
        })?;
        links.descendants.push(child.index);
        links.value_children.push(child.index);
        Ok(())
    }

    /// Validate `inputs`, bind them to fresh argument slots and insert the
    /// node built by `body`.
    fn wire<I: Inputs>(
        &mut self,
        name: Arc<str>,
        inputs: &I,
        body: impl FnOnce(Arc<str>, I::Slots) -> Box<dyn Body>,
    ) -> Result<NodeId, GraphError> {
        inputs.check(self)?;
        let slots = I::slots();
        let child = self.node_id(self.nodes.len());
        inputs.connect(self, child, &slots)?;
        let parents = inputs.parents().len();
        let id = self.insert(Arc::clone(&name), parents, body(name, slots));
        debug_assert_eq!(id, child);
        Ok(id)
    }

    fn insert(&mut self, name: Arc<str>, parents: usize, body: Box<dyn Body>) -> NodeId {
        let id = self.node_id(self.nodes.len());
        self.nodes.push(GraphNode {
            cell: Arc::new(NodeCell::new(name, parents, body)),
            links: NodeLinks {
                parents_total: parents,
                ..NodeLinks::default()
            },
        });
        id
    }
}
