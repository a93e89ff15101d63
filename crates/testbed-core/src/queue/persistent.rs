//! Durable priority queue: in-memory index over a task record store.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;

use super::index::TaskIndex;
use super::record::TaskRecordStore;
use super::{QueueStats, QueuedTask, StateLabel, TaskQueue};
use crate::error::QueueError;
use crate::ports::{DurableStore, JsonDecoder, TaskDecoder};

/// Queue whose backlog lives in a `DurableStore` and whose ordering lives in memory.
///
/// Invariant: a task is under `scheduled/<id>` in the store iff its handle is in
/// the index, except while a push or pop holds the lock.
///
/// - push: persist, then index. A failed write leaves the index untouched.
/// - pop: unindex, then look up and delete. A crash between the two leaves the
///   record behind and recovery re-admits it (at-least-once).
///
/// Several instances with different priorities may share one store. Each one
/// recovers every scheduled record at construction.
pub struct PersistentQueue<T> {
    records: TaskRecordStore<T>,
    priority: u8,
    index: Mutex<TaskIndex>,
}

impl<T: QueuedTask> PersistentQueue<T> {
    /// Bind to `store` and rebuild the index from every `scheduled` record.
    ///
    /// Fails if any record cannot be decoded; a partially recovered queue is
    /// never returned.
    pub fn new<D>(store: Arc<dyn DurableStore>, priority: u8, decoder: D) -> Result<Self, QueueError>
    where
        D: TaskDecoder<T> + 'static,
    {
        let records = TaskRecordStore::new(store, Box::new(decoder));

        let mut index = TaskIndex::new();
        for (id, _task) in records.scan(StateLabel::Scheduled)? {
            index.push(id, priority);
        }
        tracing::info!(priority, recovered = index.len(), "queue recovered");

        Ok(Self {
            records,
            priority,
            index: Mutex::new(index),
        })
    }

    pub fn push(&self, task: &T) -> Result<(), QueueError> {
        let id = task.task_id();
        if id.is_empty() {
            return Err(QueueError::InvalidTask("task id must not be empty".into()));
        }

        let mut index = self.lock_index();
        self.records.put(StateLabel::Scheduled, id, task)?;
        let sequence = index.push(id.to_string(), self.priority);
        tracing::debug!(task_id = id, priority = self.priority, sequence, "task pushed");
        Ok(())
    }

    /// Claim the highest-priority, earliest task. Never blocks.
    ///
    /// If the lookup or delete fails the handle is already gone from the index;
    /// the record (if any) comes back on the next recovery.
    pub fn pop(&self) -> Result<T, QueueError> {
        let mut index = self.lock_index();
        let handle = index.pop().ok_or(QueueError::EmptyQueue)?;

        let task = self.records.get(StateLabel::Scheduled, &handle.id)?;
        self.records.delete(StateLabel::Scheduled, &handle.id)?;
        tracing::debug!(
            task_id = %handle.id,
            priority = handle.priority,
            sequence = handle.sequence,
            remaining = index.len(),
            "task popped"
        );
        Ok(task)
    }

    pub fn len(&self) -> usize {
        self.lock_index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Snapshot of the index and the store's scheduled records.
    ///
    /// `scheduled_records` exceeds `indexed` when another instance shares the
    /// store or a pop failed after unindexing.
    pub fn stats(&self) -> Result<QueueStats, QueueError> {
        let index = self.lock_index();
        Ok(QueueStats {
            priority: self.priority,
            indexed: index.len(),
            scheduled_records: self.records.count(StateLabel::Scheduled)?,
        })
    }

    /// Direct access to the records, bypassing the index.
    pub fn records(&self) -> &TaskRecordStore<T> {
        &self.records
    }

    fn lock_index(&self) -> MutexGuard<'_, TaskIndex> {
        // index の更新は push/pop の最後の一手なので、poison 後も整合している
        self.index
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: QueuedTask + DeserializeOwned + 'static> PersistentQueue<T> {
    /// Queue decoding records with the canonical JSON encoding.
    pub fn with_json(store: Arc<dyn DurableStore>, priority: u8) -> Result<Self, QueueError> {
        Self::new(store, priority, JsonDecoder::<T>::new())
    }
}

impl<T: QueuedTask> TaskQueue<T> for PersistentQueue<T> {
    fn push(&self, task: &T) -> Result<(), QueueError> {
        PersistentQueue::push(self, task)
    }

    fn pop(&self) -> Result<T, QueueError> {
        PersistentQueue::pop(self)
    }

    fn len(&self) -> usize {
        PersistentQueue::len(self)
    }

    fn priority(&self) -> u8 {
        self.priority
    }
}
