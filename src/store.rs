//! 요청/세션 단위 키-값 저장소
//!
//! 값은 `serde_json::Value`로 보관하며, 변경 연산은 dirty 플래그를 세웁니다.
//! 핸들은 복제해도 같은 저장소를 가리킵니다.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Default)]
struct Inner {
    values: HashMap<String, Value>,
    dirty: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// 값을 JSON으로 변환해 저장합니다. 변환에 실패하면 저장하지 않습니다.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        let mut inner = self.inner.lock();
        inner.values.insert(key.to_string(), value);
        inner.dirty = true;
        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.inner.lock().values.get(key).cloned()
    }

    /// 저장된 값을 원하는 타입으로 디코드합니다. 없거나 타입이 맞지 않으면 `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_value(key).and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().values.contains_key(key)
    }

    pub fn delete(&self, key: &str) {
        let mut inner = self.inner.lock();
        if inner.values.remove(key).is_some() {
            inner.dirty = true;
        }
    }

    pub fn flush(&self) {
        let mut inner = self.inner.lock();
        inner.values.clear();
        inner.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.lock().dirty
    }

    pub fn set_clean(&self) {
        self.inner.lock().dirty = false;
    }

    /// 저장소 전체를 JSON 객체로 인코딩합니다.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.inner.lock().values)
    }

    /// JSON 객체로 내용을 교체합니다. 로드 직후 상태는 clean입니다.
    pub fn load_json(&self, raw: &[u8]) -> Result<(), serde_json::Error> {
        let values: HashMap<String, Value> = serde_json::from_slice(raw)?;
        let mut inner = self.inner.lock();
        inner.values = values;
        inner.dirty = false;
        Ok(())
    }
}
