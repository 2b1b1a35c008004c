use std::fmt;
use crate::scope::ScopeError;

/// 캐시 연산 에러
#[derive(Debug)]
pub enum CacheError {
    /// 키가 없거나 만료됨
    NotFound {
        key: String,
    },
    /// 호출자 범위가 이미 취소됨
    Cancelled,
    /// 호출자 범위의 마감 시간이 지남
    DeadlineExceeded,
    /// 값 인코딩/디코딩 실패
    Encode(serde_json::Error),
    /// 잘못된 키 패턴
    InvalidPattern {
        pattern: String,
        reason: String,
    },
    /// 원격 백엔드 에러
    Backend(String),
    /// 이미 닫힌 캐시
    Closed,
}

impl CacheError {
    pub fn not_found(key: &str) -> Self {
        CacheError::NotFound { key: key.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound { .. })
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NotFound { key } =>
                write!(f, "cache key not found: {}", key),
            CacheError::Cancelled =>
                write!(f, "cache operation cancelled"),
            CacheError::DeadlineExceeded =>
                write!(f, "cache operation deadline exceeded"),
            CacheError::Encode(e) =>
                write!(f, "cache value encoding failed: {}", e),
            CacheError::InvalidPattern { pattern, reason } =>
                write!(f, "invalid key pattern {}: {}", pattern, reason),
            CacheError::Backend(msg) =>
                write!(f, "cache backend error: {}", msg),
            CacheError::Closed =>
                write!(f, "cache is closed"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ScopeError> for CacheError {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::Cancelled => CacheError::Cancelled,
            ScopeError::DeadlineExceeded => CacheError::DeadlineExceeded,
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Encode(err)
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}
