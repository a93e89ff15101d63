//! Queue, store and worker configuration.
//!
//! Every field has a default, so a config file only needs the keys it changes:
//!
//! ```json
//! { "priority": 2, "store": { "data_dir": "/var/lib/testbed/queue" } }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How hard the store works to make a write durable before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// Leave the journal in OS buffers. Survives a process crash, not a power loss.
    Buffer,
    /// fdatasync the journal.
    SyncData,
    /// fsync the journal.
    #[default]
    SyncAll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub partition: String,
    pub durability: Durability,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/queue"),
            partition: "tasks".to_string(),
            durability: Durability::default(),
        }
    }
}

/// Drain loop settings.
///
/// Poll delay when every queue is empty: `min_backoff * multiplier^(empty_polls - 1)`,
/// capped at `max_backoff`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub workers: usize,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            min_backoff_ms: 10,
            max_backoff_ms: 1_000,
            multiplier: 2.0,
        }
    }
}

impl WorkerConfig {
    pub fn min_backoff(&self) -> Duration {
        Duration::from_millis(self.min_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub store: StoreConfig,
    /// Fixed priority tag of the queue opened with this config.
    pub priority: u8,
    pub worker: WorkerConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            priority: 1,
            worker: WorkerConfig::default(),
        }
    }
}

impl QueueConfig {
    /// Read a JSON config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_slice(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.partition.is_empty() {
            return Err(ConfigError::Invalid("store.partition must not be empty".into()));
        }
        if self.worker.workers == 0 {
            return Err(ConfigError::Invalid("worker.workers must be at least 1".into()));
        }
        if self.worker.min_backoff_ms > self.worker.max_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "worker.min_backoff_ms ({}) exceeds worker.max_backoff_ms ({})",
                self.worker.min_backoff_ms, self.worker.max_backoff_ms
            )));
        }
        if self.worker.multiplier.is_nan() || self.worker.multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "worker.multiplier must be >= 1.0, got {}",
                self.worker.multiplier
            )));
        }
        Ok(())
    }
}
