//! 키-값 캐시 서비스
//!
//! 키마다 TTL을 갖는 저장소로, 두 백엔드가 같은 계약을 만족합니다.
//!
//! - [`MemoryCache`]: 프로세스 내부 맵 + 백그라운드 만료 정리
//! - [`RedisCache`]: Redis 클라이언트
//!
//! 백엔드는 조립 시점에 `Arc<dyn CacheService>`로 주입합니다.
//!
//! ```no_run
//! use martian_stack::cache::{CacheExt, CacheService, MemoryCache};
//! use martian_stack::scope::Scope;
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), martian_stack::cache::CacheError> {
//! let cache = MemoryCache::new();
//! let scope = Scope::new();
//!
//! cache.set(&scope, "k", "v", Duration::ZERO).await?;
//! assert_eq!(cache.get_string(&scope, "k").await?, "v");
//! # Ok(())
//! # }
//! ```

mod error;
pub mod memory;
pub mod redis;

use std::time::Duration;
use async_trait::async_trait;
use regex_lite::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use crate::scope::Scope;

pub use error::CacheError;
pub use memory::MemoryCache;
pub use self::redis::RedisCache;

/// 두 백엔드가 공통으로 구현하는 캐시 계약
///
/// `ttl`이 0이면 만료되지 않으며, 어떤 `set`이든 이전 값과 만료 시각을 덮어씁니다.
/// 모든 연산은 호출자 범위가 이미 끝났으면 즉시 실패합니다.
#[async_trait]
pub trait CacheService: Send + Sync {
    /// 바이트 값을 그대로 저장합니다.
    async fn set_bytes(&self, scope: &Scope, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// 저장된 바이트를 그대로 반환합니다. 없거나 만료됐으면 `NotFound`.
    async fn get_bytes(&self, scope: &Scope, key: &str) -> Result<Vec<u8>, CacheError>;

    async fn exists(&self, scope: &Scope, key: &str) -> bool;

    /// `*` 글롭 패턴과 키의 앞부분이 일치하는 키 목록
    async fn keys(&self, scope: &Scope, pattern: &str) -> Result<Vec<String>, CacheError>;

    async fn delete(&self, scope: &Scope, keys: &[&str]) -> Result<(), CacheError>;

    async fn delete_pattern(&self, scope: &Scope, pattern: &str) -> Result<(), CacheError>;

    async fn flush(&self, scope: &Scope) -> Result<(), CacheError>;

    async fn close(&self) -> Result<(), CacheError>;
}

/// 구조화된 값(JSON) 저장/조회 도우미
#[async_trait]
pub trait CacheExt: CacheService {
    async fn set<T>(&self, scope: &Scope, key: &str, value: &T, ttl: Duration) -> Result<(), CacheError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let encoded = serde_json::to_vec(value)?;
        self.set_bytes(scope, key, encoded, ttl).await
    }

    async fn get<T>(&self, scope: &Scope, key: &str) -> Result<T, CacheError>
    where
        T: DeserializeOwned + Send,
    {
        let raw = self.get_bytes(scope, key).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn get_string(&self, scope: &Scope, key: &str) -> Result<String, CacheError> {
        self.get::<String>(scope, key).await
    }

    async fn get_int(&self, scope: &Scope, key: &str) -> Result<i64, CacheError> {
        self.get::<i64>(scope, key).await
    }

    async fn get_float(&self, scope: &Scope, key: &str) -> Result<f64, CacheError> {
        self.get::<f64>(scope, key).await
    }
}

impl<C: CacheService + ?Sized> CacheExt for C {}

/// 범위가 이미 끝났으면 그 이유를 캐시 에러로 돌려줍니다.
pub(crate) fn check_scope(scope: &Scope) -> Result<(), CacheError> {
    match scope.err() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// `user-*` 같은 글롭 패턴을 키 시작에 고정된 정규식으로 바꿉니다.
/// `*` 이외의 문자는 모두 문자 그대로 취급합니다.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, CacheError> {
    let expr = pattern
        .split('*')
        .map(regex_lite::escape)
        .collect::<Vec<_>>()
        .join(".*");

    Regex::new(&format!("^{}", expr)).map_err(|e| CacheError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
