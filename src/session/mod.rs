//! 쿠키로 식별되는 세션
//!
//! 세션 데이터는 캐시 서비스에 `sess:<id>` 키로 저장되며,
//! 요청 동안은 [`Store`] 핸들로 다뤄집니다.

mod config;
mod flash;

use std::sync::Arc;
use uuid::Uuid;
use crate::store::Store;

pub use config::SessionConfig;
pub use flash::{Flash, FlashLevel};

const KEY_PREFIX: &str = "sess:";

#[derive(Debug, Clone)]
pub struct Session {
    id: Arc<str>,
    data: Store,
}

impl Session {
    /// 새 무작위 ID로 빈 세션을 만듭니다.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Arc::from(id.into()),
            data: Store::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 캐시 키
    pub fn key_id(&self) -> String {
        format!("{}{}", KEY_PREFIX, self.id)
    }

    pub fn data(&self) -> &Store {
        &self.data
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id() {
        let session = Session::with_id("abc");
        assert_eq!(session.key_id(), "sess:abc");
    }

    #[test]
    fn test_new_sessions_have_distinct_ids() {
        let a = Session::new();
        let b = Session::new();
        assert_ne!(a.id(), b.id());
        assert!(!a.data().is_dirty());
    }
}
