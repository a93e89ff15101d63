//! FjallStore - LSM-tree（fjall）による DurableStore 実装
//!
//! # 耐久性
//! fjall の書き込みは journal に積まれますが、fsync は非同期です。
//! `put` / `delete` の直後に `Keyspace::persist` を呼び、
//! 設定された `Durability` で journal をディスクに書き出してから `Ok` を返します。

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};

use crate::config::{Durability, StoreConfig};
use crate::error::StoreError;
use crate::ports::DurableStore;

/// fjall の keyspace + partition 1 つ
///
/// `Clone` は同じ keyspace を共有します（fjall のハンドルは参照カウント）。
#[derive(Clone)]
pub struct FjallStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    durability: Durability,
}

impl FjallStore {
    /// データディレクトリを開く（無ければ作成）
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let keyspace = Config::new(&config.data_dir).open()?;
        let partition =
            keyspace.open_partition(&config.partition, PartitionCreateOptions::default())?;
        tracing::debug!(
            data_dir = %config.data_dir.display(),
            partition = %config.partition,
            "opened fjall store"
        );
        Ok(Self {
            keyspace,
            partition,
            durability: config.durability,
        })
    }

    /// journal を fsync する（durability 設定に関係なく SyncAll）
    pub fn persist(&self) -> Result<(), StoreError> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn sync(&self) -> Result<(), StoreError> {
        match self.durability {
            Durability::Buffer => {}
            Durability::SyncData => self.keyspace.persist(PersistMode::SyncData)?,
            Durability::SyncAll => self.keyspace.persist(PersistMode::SyncAll)?,
        }
        Ok(())
    }
}

impl DurableStore for FjallStore {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.partition.insert(key, value)?;
        self.sync()
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.partition.get(key)?.map(|slice| slice.to_vec()))
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        // LSM の remove は tombstone を書くだけなので、存在しないキーでも成功する
        self.partition.remove(key)?;
        self.sync()
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut entries = Vec::new();
        for item in self.partition.prefix(prefix) {
            let (key, value) = item?;
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> StoreConfig {
        StoreConfig {
            data_dir: dir.to_path_buf(),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FjallStore::open(&config(dir.path())).unwrap();

        store.put(b"scheduled/a", b"1").unwrap();
        assert_eq!(store.get(b"scheduled/a").unwrap(), Some(b"1".to_vec()));

        store.delete(b"scheduled/a").unwrap();
        assert_eq!(store.get(b"scheduled/a").unwrap(), None);

        // 冪等
        store.delete(b"scheduled/a").unwrap();
    }

    #[test]
    fn scan_is_ordered_and_prefix_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let store = FjallStore::open(&config(dir.path())).unwrap();

        store.put(b"scheduled/b", b"2").unwrap();
        store.put(b"scheduled/a", b"1").unwrap();
        store.put(b"processing/c", b"3").unwrap();

        let keys: Vec<Vec<u8>> = store
            .scan_prefix(b"scheduled/")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"scheduled/a".to_vec(), b"scheduled/b".to_vec()]);
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FjallStore::open(&config(dir.path())).unwrap();
            store.put(b"scheduled/a", b"1").unwrap();
        }
        let store = FjallStore::open(&config(dir.path())).unwrap();
        assert_eq!(store.get(b"scheduled/a").unwrap(), Some(b"1".to_vec()));
    }
}
