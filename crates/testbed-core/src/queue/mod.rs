//! Queue module: durable records, in-memory index and the queue façade.

mod index;
mod persistent;
mod record;
mod state;

pub use index::{TaskHandle, TaskIndex};
pub use persistent::PersistentQueue;
pub use record::{KEY_SEPARATOR, TaskRecordStore, record_key};
pub use state::StateLabel;

use serde::{Deserialize, Serialize};

use crate::domain::Task;
use crate::error::QueueError;

/// Anything the queue can carry.
///
/// The queue reads the id and serializes the rest as canonical JSON without
/// looking at it.
pub trait QueuedTask: Serialize + Send {
    fn task_id(&self) -> &str;
}

impl QueuedTask for Task {
    fn task_id(&self) -> &str {
        self.id.as_str()
    }
}

/// Queue port (interface) used by the drain loops.
///
/// Design intent:
/// - `pop` never waits; an empty queue is `QueueError::EmptyQueue`.
/// - Waiting and backoff belong to the caller (`worker::WorkerGroup`).
pub trait TaskQueue<T>: Send + Sync {
    fn push(&self, task: &T) -> Result<(), QueueError>;

    fn pop(&self) -> Result<T, QueueError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn priority(&self) -> u8;
}

/// Observability snapshot of one queue instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub priority: u8,
    pub indexed: usize,
    pub scheduled_records: usize,
}
