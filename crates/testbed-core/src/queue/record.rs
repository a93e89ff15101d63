//! Task record store: (state label, task id) -> encoded task.

use std::sync::Arc;

use super::{QueuedTask, StateLabel};
use crate::error::QueueError;
use crate::ports::{DurableStore, TaskDecoder};

/// Separator between the label and the task id in a record key.
pub const KEY_SEPARATOR: u8 = b'/';

/// Domain layer over a `DurableStore`.
///
/// Keys are `label || '/' || id`, so every record of one label is contiguous
/// and a prefix scan returns them in id order.
pub struct TaskRecordStore<T> {
    store: Arc<dyn DurableStore>,
    decoder: Box<dyn TaskDecoder<T>>,
}

impl<T: QueuedTask> TaskRecordStore<T> {
    pub fn new(store: Arc<dyn DurableStore>, decoder: Box<dyn TaskDecoder<T>>) -> Self {
        Self { store, decoder }
    }

    pub fn get(&self, label: StateLabel, id: &str) -> Result<T, QueueError> {
        let Some(bytes) = self.store.get(&record_key(label, id))? else {
            return Err(QueueError::NotFound {
                label,
                id: id.to_string(),
            });
        };
        self.decode(id, &bytes)
    }

    /// Encode `task` as canonical JSON and write it.
    pub fn put(&self, label: StateLabel, id: &str, task: &T) -> Result<(), QueueError> {
        let bytes = serde_json::to_vec(task)?;
        self.store.put(&record_key(label, id), &bytes)?;
        Ok(())
    }

    /// Removing an absent record is not an error.
    pub fn delete(&self, label: StateLabel, id: &str) -> Result<(), QueueError> {
        self.store.delete(&record_key(label, id))?;
        Ok(())
    }

    /// Decode every record under `label`, in key order.
    ///
    /// Stops at the first record the decoder rejects.
    pub fn scan(&self, label: StateLabel) -> Result<Vec<(String, T)>, QueueError> {
        let prefix = label_prefix(label);
        let entries = self.store.scan_prefix(&prefix)?;

        let mut tasks = Vec::with_capacity(entries.len());
        for (key, bytes) in entries {
            let id = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            let task = self.decode(&id, &bytes)?;
            tasks.push((id, task));
        }
        Ok(tasks)
    }

    /// Number of records under `label` (not decoded).
    pub fn count(&self, label: StateLabel) -> Result<usize, QueueError> {
        Ok(self.store.scan_prefix(&label_prefix(label))?.len())
    }

    fn decode(&self, id: &str, bytes: &[u8]) -> Result<T, QueueError> {
        self.decoder
            .decode(bytes)
            .map_err(|source| QueueError::Decode {
                id: id.to_string(),
                source,
            })
    }
}

fn label_prefix(label: StateLabel) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(label.as_str().len() + 1);
    prefix.extend_from_slice(label.as_str().as_bytes());
    prefix.push(KEY_SEPARATOR);
    prefix
}

pub fn record_key(label: StateLabel, id: &str) -> Vec<u8> {
    let mut key = label_prefix(label);
    key.extend_from_slice(id.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Task, TaskId, TaskType};
    use crate::impls::InMemoryStore;
    use crate::ports::JsonDecoder;
    use chrono::Utc;

    fn task(id: &str) -> Task {
        Task::new(
            TaskId::new(id),
            TaskType::Build,
            "plan",
            "case",
            Utc::now(),
            serde_json::json!({"n": 1}),
        )
    }

    fn records(store: &InMemoryStore) -> TaskRecordStore<Task> {
        TaskRecordStore::new(Arc::new(store.clone()), Box::new(JsonDecoder::new()))
    }

    #[test]
    fn key_scheme_is_label_slash_id() {
        assert_eq!(record_key(StateLabel::Scheduled, "abc"), b"scheduled/abc".to_vec());
        assert_eq!(record_key(StateLabel::Done, ""), b"done/".to_vec());
    }

    #[test]
    fn put_then_get_keeps_every_field() {
        let store = InMemoryStore::new();
        let records = records(&store);
        let original = task("a");

        records.put(StateLabel::Scheduled, "a", &original).unwrap();
        let loaded = records.get(StateLabel::Scheduled, "a").unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn missing_record_is_not_found() {
        let store = InMemoryStore::new();
        let err = records(&store).get(StateLabel::Scheduled, "nope").unwrap_err();
        assert!(matches!(
            err,
            QueueError::NotFound { label: StateLabel::Scheduled, ref id } if id == "nope"
        ));
    }

    #[test]
    fn undecodable_record_is_a_decode_error() {
        let store = InMemoryStore::new();
        store.put(b"scheduled/bad", b"{not json").unwrap();

        let err = records(&store).get(StateLabel::Scheduled, "bad").unwrap_err();
        assert!(matches!(err, QueueError::Decode { ref id, .. } if id == "bad"));
        // 調査用にレコードは残る
        assert!(store.get(b"scheduled/bad").unwrap().is_some());
    }

    #[test]
    fn labels_do_not_leak_into_each_other() {
        let store = InMemoryStore::new();
        let records = records(&store);

        records.put(StateLabel::Scheduled, "b", &task("b")).unwrap();
        records.put(StateLabel::Scheduled, "a", &task("a")).unwrap();
        records.put(StateLabel::Processing, "c", &task("c")).unwrap();

        let scheduled: Vec<String> = records
            .scan(StateLabel::Scheduled)
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(scheduled, vec!["a", "b"]);
        assert_eq!(records.count(StateLabel::Processing).unwrap(), 1);
        assert_eq!(records.count(StateLabel::Done).unwrap(), 0);
    }

    #[test]
    fn delete_is_idempotent() {
        let store = InMemoryStore::new();
        let records = records(&store);
        records.put(StateLabel::Scheduled, "a", &task("a")).unwrap();

        records.delete(StateLabel::Scheduled, "a").unwrap();
        records.delete(StateLabel::Scheduled, "a").unwrap();
        assert!(store.is_empty());
    }
}
