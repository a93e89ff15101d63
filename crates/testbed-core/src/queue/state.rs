//! State labels used as the first component of a record key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Durable state a record is filed under.
///
/// The queue itself only reads and writes `Scheduled`; the other labels let
/// callers track claimed and finished tasks in the same store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateLabel {
    /// Queued, not yet claimed.
    Scheduled,
    Processing,
    Done,
}

impl StateLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            StateLabel::Scheduled => "scheduled",
            StateLabel::Processing => "processing",
            StateLabel::Done => "done",
        }
    }
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
