use crate::{
    error::NodeError,
    node::{inputs::Inputs, output::Output},
    utils::panic_message,
};
use core::marker::PhantomData;
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

/// Type-erased callable of a node together with its argument slots and,
/// for value-producing nodes, its result slot.
pub(crate) trait Body: Send {
    /// Run the callable once and fan its value out to the consumers.
    ///
    /// On failure the callable may not have run; consumers are told that
    /// this node failed.
    fn run(&mut self) -> Result<(), NodeError>;

    /// Constraint checks that must hold before anything is dispatched.
    fn validate(&self) -> Result<(), NodeError>;

    /// Clear the stored result and every argument slot.
    fn reset(&mut self);

    /// The `Output<T>` of a value-producing node.
    fn output_mut(&mut self) -> Option<&mut (dyn Any + 'static)>;
}

/// Run user code (the callable, or `Clone` while fanning a result out),
/// turning a panic into a node failure.
fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, NodeError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| NodeError::Panicked {
        message: panic_message(&*payload),
    })
}

/// Body of a node whose callable returns a value.
pub(crate) struct ValueBody<I: Inputs, F, T> {
    callable: F,
    inputs: I::Slots,
    output: Output<T>,
    _marker: PhantomData<fn() -> I>,
}

impl<I: Inputs, F, T> ValueBody<I, F, T> {
    pub(crate) fn new(callable: F, inputs: I::Slots, output: Output<T>) -> Self {
        Self {
            callable,
            inputs,
            output,
            _marker: PhantomData,
        }
    }
}

impl<I, F, T> Body for ValueBody<I, F, T>
where
    I: Inputs,
    F: FnMut(I::Values) -> T + Send + 'static,
    T: Send + 'static,
{
    fn run(&mut self) -> Result<(), NodeError> {
        let Self {
            callable,
            inputs,
            output,
            _marker,
        } = self;
        let outcome = output
            .check()
            .and_then(|()| I::take(inputs))
            .and_then(|values| guarded(|| callable(values)))
            .and_then(|value| guarded(|| output.publish(value)));
        if outcome.is_err() {
            output.fail();
        }
        outcome
    }

    fn validate(&self) -> Result<(), NodeError> {
        self.output.check()
    }

    fn reset(&mut self) {
        I::clear(&self.inputs);
        self.output.reset();
    }

    fn output_mut(&mut self) -> Option<&mut (dyn Any + 'static)> {
        Some(&mut self.output)
    }
}

/// Body of a node whose callable produces no value.
pub(crate) struct TaskBody<I: Inputs, F> {
    callable: F,
    inputs: I::Slots,
    _marker: PhantomData<fn() -> I>,
}

impl<I: Inputs, F> TaskBody<I, F> {
    pub(crate) fn new(callable: F, inputs: I::Slots) -> Self {
        Self {
            callable,
            inputs,
            _marker: PhantomData,
        }
    }
}

impl<I, F> Body for TaskBody<I, F>
where
    I: Inputs,
    F: FnMut(I::Values) + Send + 'static,
{
    fn run(&mut self) -> Result<(), NodeError> {
        let values = I::take(&self.inputs)?;
        guarded(|| (self.callable)(values))
    }

    fn validate(&self) -> Result<(), NodeError> {
        Ok(())
    }

    fn reset(&mut self) {
        I::clear(&self.inputs);
    }

    fn output_mut(&mut self) -> Option<&mut (dyn Any + 'static)> {
        None
    }
}
