//! DurableStore port - 順序付きの永続 KV ストア
//!
//! キューの下にある byte-keyed なストアです。
//! open/close のライフサイクルは呼び出し側が管理し、キューは共有ハンドルを受け取るだけです。
//!
//! # 実装
//! - **FjallStore**: LSM-tree（fjall）による永続実装
//! - **InMemoryStore**: テスト・一時用途

use crate::error::StoreError;

/// DurableStore は順序付きの byte-keyed KV
///
/// # 契約
/// - `put` / `delete` が `Ok` を返したら再起動後も残る
/// - `get` はキーが無ければ `Ok(None)`
/// - `delete` は冪等（存在しないキーの削除はエラーにしない）
/// - `scan_prefix` はキー昇順
/// - 複数キーにまたがる原子性は提供しない（キュー側の責務）
///
/// # Thread Safety
/// - 複数のキューインスタンスから `Arc<dyn DurableStore>` で共有される
pub trait DurableStore: Send + Sync {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// `prefix` で始まる全エントリをキー昇順で返す
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}
