//! Domain model（Task, TaskId, 状態）
//!
//! キュー自体は task の形に依存しません（`queue::QueuedTask` で抽象化）。
//! ここにあるのはデーモンが実際にスケジュールする build/run タスクの形です。

pub mod ids;
pub mod task;

pub use ids::TaskId;
pub use task::{Task, TaskState, TaskStateRecord, TaskType};
