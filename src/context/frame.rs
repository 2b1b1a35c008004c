use bytes::Bytes;
use http_body_util::Full;
use hyper::{HeaderMap, Response, StatusCode};

/// 한 요청의 체인 커서와 작성 중인 응답
///
/// `Ctx` 복제본은 모두 같은 프레임을 공유합니다.
/// `status`가 `Some`이면 상태 코드가 이미 확정된 것입니다.
#[derive(Debug, Clone, Default)]
pub(crate) struct Frame {
    pub cursor: usize,
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub body_written: bool,
}

impl Frame {
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut res = Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *res.headers_mut() = self.headers;
        res
    }
}
