//! FIFO of ready-to-run work items shared by all workers of a pool.
//!
//! `push` never blocks, `pop` and `is_empty` are best-effort snapshots; all
//! three are safe under concurrent producers and consumers.

use core::fmt;

#[cfg(not(feature = "loom"))]
mod imp {
    use crossbeam_deque::{Injector, Steal};

    pub(crate) struct WorkQueue<T> {
        inner: Injector<T>,
    }

    impl<T> WorkQueue<T> {
        pub(crate) fn new() -> Self {
            Self {
                inner: Injector::new(),
            }
        }

        pub(crate) fn push(&self, item: T) {
            self.inner.push(item);
        }

        pub(crate) fn pop(&self) -> Option<T> {
            loop {
                match self.inner.steal() {
                    Steal::Success(item) => return Some(item),
                    Steal::Empty => return None,
                    Steal::Retry => {}
                }
            }
        }

        pub(crate) fn is_empty(&self) -> bool {
            self.inner.is_empty()
        }

        pub(crate) fn len(&self) -> usize {
            self.inner.len()
        }
    }
}

#[cfg(feature = "loom")]
mod imp {
    use crate::sync::{Mutex, lock};
    use std::collections::VecDeque;

    pub(crate) struct WorkQueue<T> {
        inner: Mutex<VecDeque<T>>,
    }

    impl<T> WorkQueue<T> {
        pub(crate) fn new() -> Self {
            Self {
                inner: Mutex::new(VecDeque::new()),
            }
        }

        pub(crate) fn push(&self, item: T) {
            lock(&self.inner).push_back(item);
        }

        pub(crate) fn pop(&self) -> Option<T> {
            lock(&self.inner).pop_front()
        }

        pub(crate) fn is_empty(&self) -> bool {
            lock(&self.inner).is_empty()
        }

        pub(crate) fn len(&self) -> usize {
            lock(&self.inner).len()
        }
    }
}

pub(crate) use imp::WorkQueue;

impl<T> fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("len", &self.len())
            .finish()
    }
}
