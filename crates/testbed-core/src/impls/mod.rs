//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **FjallStore**: 本番用の永続ストア（LSM-tree）
//! - **InMemoryStore**: テスト・一時用途

pub mod fjall_store;
pub mod inmem_store;

pub use self::fjall_store::FjallStore;
pub use self::inmem_store::InMemoryStore;
