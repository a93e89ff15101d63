//! Task identifiers.
//!
//! `TaskId` は文字列ベースの ID です。
//! キューは ID の中身を解釈せず、store のキー（`scheduled/<id>`）としてのみ使います。
//!
//! ## ULID を使う理由
//! デーモンが発行する ID は monotonic な ULID です（`ports::IdGenerator`）。
//! ULID は時刻順にソート可能なので、キー順 = 投入順となり、
//! recovery 時のスキャン順がそのまま FIFO 順になります。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of a queued Task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 空文字列の ID はキューに投入できない
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// ULID を小文字の Crockford base32 で表現する（ソート順は保たれる）
impl From<Ulid> for TaskId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid.to_string().to_lowercase())
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ulid_ids_keep_sort_order() {
        let mut generator = ulid::Generator::new();
        let a = TaskId::from(generator.generate().unwrap());
        let b = TaskId::from(generator.generate().unwrap());
        let c = TaskId::from(generator.generate().unwrap());

        assert!(a < b);
        assert!(b < c);
        assert!(a.as_str().chars().all(|ch| !ch.is_ascii_uppercase()));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = TaskId::new("bt4brhjpc98qra498sg0");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"bt4brhjpc98qra498sg0\"");

        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn empty_id_is_detected() {
        assert!(TaskId::new("").is_empty());
        assert!(!TaskId::from("a").is_empty());
    }
}
