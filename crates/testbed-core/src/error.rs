use thiserror::Error;

use crate::queue::StateLabel;

/// Failure reported by a `DurableStore` backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend: {0}")]
    Backend(#[from] fjall::Error),

    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage lock poisoned")]
    Poisoned,
}

/// Error type for queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Key absent on get. Deletes never produce this.
    #[error("task not found: {label}/{id}")]
    NotFound { label: StateLabel, id: String },

    /// Stored bytes were rejected by the injected decoder. The record stays in the store.
    #[error("failed to decode task {id}: {source}")]
    Decode {
        id: String,
        #[source]
        source: DecodeError,
    },

    #[error("failed to encode task: {0}")]
    Encode(#[from] serde_json::Error),

    /// Nothing to pop. Expected, not fatal.
    #[error("queue is empty")]
    EmptyQueue,

    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A pop running on the blocking pool panicked or was cancelled.
    #[error("blocking pop aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl QueueError {
    pub fn is_empty_queue(&self) -> bool {
        matches!(self, QueueError::EmptyQueue)
    }
}

/// Error produced by a `TaskDecoder`.
pub type DecodeError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
