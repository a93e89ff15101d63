//! IdGenerator port - TaskId 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: monotonic ULID（本番用）

use std::sync::Mutex;
use std::time::SystemTime;

use ulid::Generator;

use crate::domain::TaskId;
use crate::ports::Clock;

/// IdGenerator は TaskId を生成
///
/// # 要件
/// - 生成順 = 文字列のソート順（recovery 時のキー順が投入順になる）
/// - `Send + Sync`（複数スレッドから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;
}

/// UlidGenerator は monotonic ULID ベースの ID 生成器
///
/// 同一ミリ秒内ではランダム部をインクリメントするので、
/// FixedClock を使っても生成順にソートされます。
pub struct UlidGenerator<C> {
    clock: C,
    generator: Mutex<Generator>,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            generator: Mutex::new(Generator::new()),
        }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        let at = SystemTime::from(self.clock.now());
        let mut generator = self
            .generator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match generator.generate_from_datetime(at) {
            Ok(ulid) => TaskId::from(ulid),
            // random 部が溢れた場合（同一ミリ秒に 2^80 個）は新しい乱数で作り直す
            Err(_) => TaskId::from(ulid::Ulid::from_datetime(at)),
        }
    }
}
