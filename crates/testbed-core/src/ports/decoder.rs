//! TaskDecoder port - 保存済み bytes から task を復元する戦略
//!
//! キューは具体的な task の形を知りません。
//! 構築時に decoder を注入することで、同じキュー実装で任意の task を扱えます。

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::error::DecodeError;

/// TaskDecoder は `bytes -> T` の変換
///
/// エンコード側（canonical JSON）の完全な逆変換である必要があります。
///
/// # 使用例
/// ```ignore
/// let queue = PersistentQueue::new(store, 1, |bytes: &[u8]| {
///     serde_json::from_slice::<Task>(bytes)
/// })?;
/// ```
pub trait TaskDecoder<T>: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<T, DecodeError>;
}

/// クロージャをそのまま decoder として使えるようにする
impl<T, E, F> TaskDecoder<T> for F
where
    F: Fn(&[u8]) -> Result<T, E> + Send + Sync,
    E: std::error::Error + Send + Sync + 'static,
{
    fn decode(&self, bytes: &[u8]) -> Result<T, DecodeError> {
        self(bytes).map_err(|e| Box::new(e) as DecodeError)
    }
}

/// JSON decoder（canonical encoding の逆変換）
pub struct JsonDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> TaskDecoder<T> for JsonDecoder<T> {
    fn decode(&self, bytes: &[u8]) -> Result<T, DecodeError> {
        serde_json::from_slice(bytes).map_err(|e| Box::new(e) as DecodeError)
    }
}
