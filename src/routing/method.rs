use std::fmt;
use std::str::FromStr;
use tracing::warn;
use super::RoutingError;

/// 라우트 등록 메서드
///
/// `Any`는 메서드와 관계없이 매칭됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Connect,
    Options,
    Trace,
    Any,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Any => "ANY",
        }
    }

    /// 문자열을 메서드로 바꿉니다. 알 수 없는 값은 경고 후 GET으로 처리합니다.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|e: RoutingError| {
            warn!(error = %e, "알 수 없는 메서드를 GET으로 등록합니다");
            Method::Get
        })
    }

    /// 요청 메서드가 이 라우트에 해당하는지 확인합니다. GET 라우트는 HEAD에도 응답합니다.
    pub fn matches(&self, method: &hyper::Method) -> bool {
        match self {
            Method::Any => true,
            Method::Get => *method == hyper::Method::GET || *method == hyper::Method::HEAD,
            other => other.as_str() == method.as_str(),
        }
    }
}

impl FromStr for Method {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "CONNECT" => Ok(Method::Connect),
            "OPTIONS" => Ok(Method::Options),
            "TRACE" => Ok(Method::Trace),
            "ANY" => Ok(Method::Any),
            _ => Err(RoutingError::InvalidMethod(s.to_string())),
        }
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        Method::parse_lenient(s)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
