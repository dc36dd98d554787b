//! Typed per-component event queues.
//!
//! Components never call each other back. They push events into their own
//! [`Outbox`] and the coordinator drains every outbox once per frame, which
//! keeps dispatch order explicit and makes reentrancy impossible.

use smallvec::SmallVec;
use std::fmt;

/// FIFO of events produced by one component during a frame.
#[derive(Clone, PartialEq, Eq)]
pub struct Outbox<E> {
    pending: SmallVec<[E; 4]>,
}

impl<E> Outbox<E> {
    /// Create an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: SmallVec::new(),
        }
    }

    /// Queue an event for the next drain.
    pub fn push(&mut self, event: E) {
        self.pending.push(event);
    }

    /// Remove and return every queued event in emission order.
    pub fn drain(&mut self) -> Vec<E> {
        self.pending.drain(..).collect()
    }

    /// Peek at queued events without consuming them.
    #[must_use]
    pub fn pending(&self) -> &[E] {
        &self.pending
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Drop queued events, used when a component is torn down mid-frame.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl<E> Default for Outbox<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: fmt::Debug> fmt::Debug for Outbox<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.pending.iter()).finish()
    }
}
