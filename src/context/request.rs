use std::collections::HashMap;
use std::net::SocketAddr;
use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Uri};
use tokio::sync::Mutex;
use crate::error::{Error, HttpError, Result};

/// 요청 본문 최대 크기 (1 MiB)
pub const MAX_BODY_BYTES: usize = 1 << 20;

enum Body {
    Pending(Incoming),
    Ready(Bytes),
    Failed(BodyFailure),
}

/// 본문 수집이 실패한 이유. 이후 읽기에서도 같은 에러를 돌려줍니다.
#[derive(Debug, Clone)]
enum BodyFailure {
    TooLarge,
    Read(String),
    Interrupted,
}

impl BodyFailure {
    fn to_error(&self) -> Error {
        match self {
            BodyFailure::TooLarge => Error::Http(HttpError::from_status(413)),
            BodyFailure::Read(reason) => Error::Body(reason.clone()),
            BodyFailure::Interrupted => Error::Body("request body read was interrupted".to_string()),
        }
    }
}

/// 읽기 전용 요청 정보
///
/// 본문은 처음 읽을 때 한 번만 수집되고 이후에는 캐시된 값을 돌려줍니다.
pub struct RequestInfo {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) remote_addr: Option<SocketAddr>,
    pub(crate) https: bool,
    pub(crate) params: HashMap<String, String>,
    body: Mutex<Body>,
}

impl RequestInfo {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            remote_addr: None,
            https: false,
            params: HashMap::new(),
            body: Mutex::new(Body::Ready(Bytes::new())),
        }
    }

    pub(crate) fn from_hyper(
        req: hyper::Request<Incoming>,
        remote_addr: Option<SocketAddr>,
        https: bool,
    ) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            remote_addr,
            https,
            params: HashMap::new(),
            body: Mutex::new(Body::Pending(body)),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(self, body: impl Into<Bytes>) -> Self {
        Self { body: Mutex::new(Body::Ready(body.into())), ..self }
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub(crate) async fn body(&self) -> Result<Bytes> {
        let mut body = self.body.lock().await;
        // 수집 도중 future가 drop되면 Interrupted가 남음
        match std::mem::replace(&mut *body, Body::Failed(BodyFailure::Interrupted)) {
            Body::Ready(bytes) => {
                *body = Body::Ready(bytes.clone());
                Ok(bytes)
            }
            Body::Pending(incoming) => match Limited::new(incoming, MAX_BODY_BYTES).collect().await {
                Ok(collected) => {
                    let bytes = collected.to_bytes();
                    *body = Body::Ready(bytes.clone());
                    Ok(bytes)
                }
                Err(e) => {
                    let failure = if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                        BodyFailure::TooLarge
                    } else {
                        BodyFailure::Read(e.to_string())
                    };
                    let err = failure.to_error();
                    *body = Body::Failed(failure);
                    Err(err)
                }
            },
            Body::Failed(failure) => {
                let err = failure.to_error();
                *body = Body::Failed(failure);
                Err(err)
            }
        }
    }
}
