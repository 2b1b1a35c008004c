use std::fmt;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use crate::cache::CacheError;

pub type Result<T> = std::result::Result<T, Error>;

/// 핸들러가 의도한 상태 코드와 메시지를 담는 구조화된 에러입니다.
///
/// JSON으로는 `{"code": 404, "msg": "Resource not found"}` 형태로 직렬화됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpError {
    pub code: u16,
    pub msg: String,
}

impl HttpError {
    pub fn new(code: u16, msg: impl Into<String>) -> Self {
        Self { code, msg: msg.into() }
    }

    /// 상태 코드의 표준 사유 문구를 메시지로 사용합니다.
    pub fn from_status(code: u16) -> Self {
        Self { code, msg: reason_phrase(code).to_string() }
    }

    /// 코드를 바꾸고, 표준 사유 문구가 있으면 메시지도 함께 바꿉니다.
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        let reason = reason_phrase(code);
        if !reason.is_empty() {
            self.msg = reason.to_string();
        }
        self
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = msg.into();
        self
    }

    /// 응답 상태 코드. HTTP 상태 코드로 쓸 수 없는 값(100-999 밖)은 500입니다.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// 코드를 실제로 응답할 상태 코드로 맞춘 복제본. 메시지는 유지합니다.
    pub fn resolved(&self) -> Self {
        Self { code: self.status().as_u16(), msg: self.msg.clone() }
    }

    pub fn is_error(&self) -> bool {
        self.code >= 400
    }

    pub fn not_found() -> Self {
        Self::new(404, "Resource not found")
    }

    pub fn session_not_started() -> Self {
        Self::new(500, "Session not started")
    }

    pub fn request_timed_out() -> Self {
        Self::new(503, "Request timed out")
    }

    pub fn rate_limit_exceeded() -> Self {
        Self::new(429, "Rate limit exceeded")
    }
}

impl Default for HttpError {
    fn default() -> Self {
        Self::from_status(500)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for HttpError {}

/// 상태 코드의 표준 사유 문구. 알 수 없는 코드는 빈 문자열입니다.
pub fn reason_phrase(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

/// 핸들러 체인 전체에서 사용하는 에러 타입입니다.
#[derive(Debug)]
pub enum Error {
    Http(HttpError),
    Cache(CacheError),
    Json(serde_json::Error),
    Body(String),
    Io(std::io::Error),
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// 응답에 사용할 상태 코드. 구조화된 에러가 아니면 500입니다.
    pub fn status(&self) -> u16 {
        match self {
            Error::Http(e) => e.status().as_u16(),
            _ => 500,
        }
    }

    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            Error::Http(e) => Some(e),
            _ => None,
        }
    }

    /// 구조화된 에러로 변환합니다. 그 외의 에러는 {500, 원래 메시지}가 됩니다.
    pub fn to_http(&self) -> HttpError {
        match self {
            Error::Http(e) => e.resolved(),
            other => HttpError::default().with_msg(other.to_string()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "{}", e),
            Error::Cache(e) => write!(f, "{}", e),
            Error::Json(e) => write!(f, "{}", e),
            Error::Body(msg) => write!(f, "{}", msg),
            Error::Io(e) => write!(f, "{}", e),
            Error::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Cache(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Other(e) => Some(e.as_ref()),
            Error::Body(_) => None,
        }
    }
}

impl From<HttpError> for Error {
    fn from(err: HttpError) -> Self {
        Error::Http(err)
    }
}

impl From<CacheError> for Error {
    fn from(err: CacheError) -> Self {
        Error::Cache(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Error {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Error::Other(err)
    }
}
