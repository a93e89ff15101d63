//! In-memory index of queued task handles.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Lightweight stand-in for a queued task. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: String,
    pub priority: u8,
    pub sequence: u64,
}

impl PartialOrd for TaskHandle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskHandle {
    // Max-heap: higher priority wins, then the lower (earlier) sequence.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Priority/FIFO ordered handles plus the sequence counter that feeds them.
#[derive(Debug, Default)]
pub struct TaskIndex {
    heap: BinaryHeap<TaskHandle>,
    next_sequence: u64,
}

impl TaskIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a handle for `id`, returning the sequence it was given.
    pub fn push(&mut self, id: String, priority: u8) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(TaskHandle {
            id,
            priority,
            sequence,
        });
        sequence
    }

    pub fn pop(&mut self) -> Option<TaskHandle> {
        self.heap.pop()
    }

    pub fn peek(&self) -> Option<&TaskHandle> {
        self.heap.peek()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
