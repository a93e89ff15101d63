//! testbed-core
//!
//! Persistent task queue for the testbed daemon.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（Task, TaskId, TaskType, TaskState）
//! - **ports**: 抽象化レイヤー（DurableStore, TaskDecoder, Clock, IdGenerator）
//! - **impls**: 実装（FjallStore, InMemoryStore）
//! - **queue**: 永続キュー本体（TaskRecordStore, TaskIndex, PersistentQueue）
//! - **worker**: キューを drain する非同期ワーカー（WorkerGroup）
//! - **config**: 設定（QueueConfig）
//! - **error**: エラー型
//!
//! # 例
//! ```no_run
//! use std::sync::Arc;
//! use testbed_core::config::StoreConfig;
//! use testbed_core::domain::Task;
//! use testbed_core::impls::FjallStore;
//! use testbed_core::queue::PersistentQueue;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(FjallStore::open(&StoreConfig::default())?);
//! let queue = PersistentQueue::<Task>::with_json(store, 1)?;
//! while let Ok(task) = queue.pop() {
//!     println!("claimed {}", task.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;
pub mod worker;

pub use error::{ConfigError, QueueError, StoreError};
pub use queue::{PersistentQueue, QueuedTask, TaskQueue};
