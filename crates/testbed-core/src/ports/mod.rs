//! Ports - 抽象化レイヤー
//!
//! キューが外部に要求するもの（永続ストア、decode 戦略）と、
//! デーモン側が差し替えたいもの（時刻、ID 生成）を trait として定義します。
//!
//! # 設計原則
//! - 永続ストアが正本（source of truth）
//! - メモリ上の index はストアからいつでも再構築できる

pub mod durable_store;
pub mod decoder;
pub mod clock;
pub mod id_generator;

pub use self::durable_store::DurableStore;
pub use self::decoder::{JsonDecoder, TaskDecoder};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
