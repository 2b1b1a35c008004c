use std::fmt;

/// 라우트 등록 에러
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingError {
    /// 잘못된 경로 패턴
    InvalidPathPattern {
        pattern: String,
        reason: String,
    },
    /// 지원하지 않는 HTTP 메서드
    InvalidMethod(String),
}

impl RoutingError {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        RoutingError::InvalidPathPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::InvalidPathPattern { pattern, reason } =>
                write!(f, "잘못된 경로 패턴: {} ({})", pattern, reason),
            RoutingError::InvalidMethod(method) =>
                write!(f, "지원하지 않는 HTTP 메서드: {}", method),
        }
    }
}

impl std::error::Error for RoutingError {}
