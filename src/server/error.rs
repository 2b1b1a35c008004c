use std::fmt;
use crate::routing::RoutingError;
use crate::tls::TlsError;

#[derive(Debug)]
pub enum ServerError {
    /// 리스너 바인딩 실패
    Bind {
        addr: String,
        source: std::io::Error,
    },
    Io(std::io::Error),
    Tls(TlsError),
    Routing(RoutingError),
    /// 서버 태스크가 비정상 종료됨
    Join(tokio::task::JoinError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Bind { addr, source } => write!(f, "{} 바인딩 실패: {}", addr, source),
            ServerError::Io(e) => write!(f, "IO 에러: {}", e),
            ServerError::Tls(e) => write!(f, "TLS 에러: {}", e),
            ServerError::Routing(e) => write!(f, "라우팅 에러: {}", e),
            ServerError::Join(e) => write!(f, "서버 태스크 에러: {}", e),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Bind { source, .. } => Some(source),
            ServerError::Io(e) => Some(e),
            ServerError::Tls(e) => Some(e),
            ServerError::Routing(e) => Some(e),
            ServerError::Join(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Io(err)
    }
}

impl From<TlsError> for ServerError {
    fn from(err: TlsError) -> Self {
        ServerError::Tls(err)
    }
}

impl From<RoutingError> for ServerError {
    fn from(err: RoutingError) -> Self {
        ServerError::Routing(err)
    }
}
