use crate::{error::NodeError, node::inputs::InputSlot, sync::Arc};

/// Result slot of a value-producing node plus the argument slots of the
/// children consuming that value.
pub(crate) struct Output<T> {
    owner: Arc<str>,
    /// `Some` for duplicable results, `None` for move-only ones.
    duplicate: Option<fn(&T) -> T>,
    value: Option<T>,
    /// The move-only value was handed to its single consumer or retrieved.
    transferred: bool,
    consumers: Vec<Arc<InputSlot<T>>>,
}

impl<T> Output<T> {
    pub(crate) fn duplicable(owner: Arc<str>) -> Self
    where
        T: Clone,
    {
        Self::new(owner, Some(T::clone as fn(&T) -> T))
    }

    pub(crate) fn move_only(owner: Arc<str>) -> Self {
        Self::new(owner, None)
    }

    fn new(owner: Arc<str>, duplicate: Option<fn(&T) -> T>) -> Self {
        Self {
            owner,
            duplicate,
            value: None,
            transferred: false,
            consumers: Vec::new(),
        }
    }

    pub(crate) fn add_consumer(&mut self, slot: Arc<InputSlot<T>>) {
        self.consumers.push(slot);
    }

    /// A move-only value can be handed to at most one consumer.
    pub(crate) fn check(&self) -> Result<(), NodeError> {
        if self.duplicate.is_none() && self.consumers.len() > 1 {
            return Err(NodeError::MultipleConsumers {
                consumers: self.consumers.len(),
            });
        }
        Ok(())
    }

    /// Store a freshly computed value and hand it to the consumers.
    pub(crate) fn publish(&mut self, value: T) {
        match (self.duplicate, self.consumers.as_slice()) {
            (Some(duplicate), consumers) => {
                for consumer in consumers {
                    consumer.deliver(Ok(duplicate(&value)));
                }
                self.value = Some(value);
            }
            (None, [consumer]) => {
                consumer.deliver(Ok(value));
                self.transferred = true;
            }
            (None, _) => self.value = Some(value),
        }
    }

    /// Tell every consumer that this node failed.
    pub(crate) fn fail(&self) {
        for consumer in &self.consumers {
            consumer.deliver(Err(NodeError::UpstreamFailed {
                parent: self.owner.to_string(),
            }));
        }
    }

    /// Copy the stored value out, or move it out if it cannot be duplicated.
    pub(crate) fn retrieve(&mut self) -> Option<T> {
        match self.duplicate {
            Some(duplicate) => self.value.as_ref().map(duplicate),
            None => {
                let value = self.value.take();
                self.transferred |= value.is_some();
                value
            }
        }
    }

    pub(crate) fn was_transferred(&self) -> bool {
        self.transferred
    }

    pub(crate) fn reset(&mut self) {
        self.value = None;
        self.transferred = false;
    }
}
