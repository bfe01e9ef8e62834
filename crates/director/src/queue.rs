//! Command Queue
//!
//! Unbounded FIFO shared between any number of producers and the single
//! director consumer. Cloning a [`CommandQueue`] clones the handle, not the
//! contents.

use pit_events::Command;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    inner: Arc<Mutex<VecDeque<Command>>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Command>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a command. Never blocks beyond the queue lock.
    pub fn enqueue(&self, command: Command) {
        self.lock().push_back(command);
    }

    /// Removes the oldest command.
    pub fn pop(&self) -> Option<Command> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Empties the queue, returning what was pending in order.
    pub fn drain(&self) -> Vec<Command> {
        self.lock().drain(..).collect()
    }
}
