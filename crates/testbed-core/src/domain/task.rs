//! The task shape the daemon schedules: one build or run of a test plan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TaskId;

/// What the worker should do with the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Build,
    Run,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Build => f.write_str("build"),
            TaskType::Run => f.write_str("run"),
        }
    }
}

/// Lifecycle state recorded in a task's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Scheduled,
    Processing,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStateRecord {
    pub state: TaskState,
    pub created: DateTime<Utc>,
}

/// A unit of schedulable work.
///
/// The queue only looks at `id`. Everything else is carried through the
/// canonical JSON encoding untouched, so new fields must stay serde-compatible
/// with records already sitting in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub plan: String,
    pub case: String,
    pub created: DateTime<Utc>,

    /// Opaque composition payload, interpreted by the runner.
    #[serde(default)]
    pub input: serde_json::Value,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<TaskStateRecord>,
}

impl Task {
    /// Create a task in the `Scheduled` state.
    pub fn new(
        id: TaskId,
        task_type: TaskType,
        plan: impl Into<String>,
        case: impl Into<String>,
        created: DateTime<Utc>,
        input: serde_json::Value,
    ) -> Self {
        Self {
            id,
            task_type,
            plan: plan.into(),
            case: case.into(),
            created,
            input,
            states: vec![TaskStateRecord {
                state: TaskState::Scheduled,
                created,
            }],
        }
    }

    /// Most recent state, if any history was recorded.
    pub fn state(&self) -> Option<TaskState> {
        self.states.last().map(|r| r.state)
    }

    pub fn transition(&mut self, state: TaskState, at: DateTime<Utc>) {
        self.states.push(TaskStateRecord { state, created: at });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Task {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Task::new(
            TaskId::new("bt4brhjpc98qra498sg0"),
            TaskType::Run,
            "network",
            "ping-pong",
            at,
            serde_json::json!({"instances": 4, "runner": "local:exec"}),
        )
    }

    #[test]
    fn new_task_starts_scheduled() {
        assert_eq!(sample().state(), Some(TaskState::Scheduled));
    }

    #[test]
    fn transition_appends_history() {
        let mut task = sample();
        let later = task.created + chrono::Duration::seconds(5);
        task.transition(TaskState::Processing, later);

        assert_eq!(task.states.len(), 2);
        assert_eq!(task.state(), Some(TaskState::Processing));
    }

    #[test]
    fn json_uses_lowercase_type_tag() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["type"], "run");
        assert_eq!(value["states"][0]["state"], "scheduled");
    }

    #[test]
    fn minimal_record_decodes_with_defaults() {
        let raw = r#"{"id":"x","type":"build","plan":"p","case":"c","created":"2024-01-01T00:00:00Z"}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.input, serde_json::Value::Null);
        assert!(task.states.is_empty());
        assert_eq!(task.state(), None);
    }
}
