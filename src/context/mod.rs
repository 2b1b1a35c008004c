//! 요청 컨텍스트
//!
//! [`Ctx`]는 요청마다 하나 만들어져 체인의 모든 핸들러에 값으로 전달됩니다.
//! 복제본은 같은 커서, 상태 코드, 응답 헤더와 본문을 공유합니다.

mod frame;
mod request;

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Response, StatusCode, Uri};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;
use crate::error::{reason_phrase, Error, HttpError, Result};
use crate::middleware::Chain;
use crate::scope::Scope;
use crate::session::Session;
use crate::store::Store;

pub(crate) use frame::Frame;
pub use request::{RequestInfo, MAX_BODY_BYTES};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

#[derive(Clone)]
pub struct Ctx {
    id: Arc<str>,
    request: Arc<RequestInfo>,
    chain: Chain,
    frame: Arc<Mutex<Frame>>,
    store: Store,
    session: Arc<Mutex<Option<Session>>>,
    scope: Scope,
}

impl Ctx {
    pub fn new(request: RequestInfo, chain: Chain, scope: Scope) -> Self {
        Self {
            id: Arc::from(Uuid::new_v4().to_string()),
            request: Arc::new(request),
            chain,
            frame: Arc::new(Mutex::new(Frame::default())),
            store: Store::new(),
            session: Arc::new(Mutex::new(None)),
            scope,
        }
    }

    /// 커서를 한 칸 옮겨 다음 핸들러를 실행하고 그 결과를 반환합니다.
    /// 체인이 끝났으면 `Ok(())`.
    pub async fn next(&self) -> Result<()> {
        let handler = {
            let mut frame = self.frame.lock();
            match self.chain.get(frame.cursor) {
                Some(handler) => {
                    frame.cursor += 1;
                    handler.clone()
                }
                None => return Ok(()),
            }
        };
        handler.handle(self.clone()).await
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// 취소/마감 범위만 바꾼 복제본. 나머지 상태는 공유합니다.
    pub fn with_scope(&self, scope: Scope) -> Ctx {
        Ctx { scope, ..self.clone() }
    }

    /// 응답 프레임을 복사해 독립적으로 쓰는 복제본을 만듭니다.
    pub(crate) fn fork(&self, scope: Scope) -> Ctx {
        let frame = self.frame.lock().clone();
        Ctx {
            frame: Arc::new(Mutex::new(frame)),
            scope,
            ..self.clone()
        }
    }

    /// 포크된 복제본의 프레임을 이 컨텍스트의 것으로 채택합니다.
    pub(crate) fn adopt(&self, forked: &Ctx) {
        let frame = forked.frame.lock().clone();
        *self.frame.lock() = frame;
    }

    pub(crate) fn take_response(&self) -> Response<Full<Bytes>> {
        std::mem::take(&mut *self.frame.lock()).into_response()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// 현재 세션. 세션이 시작되지 않았으면 500 에러입니다.
    pub fn session(&self) -> Result<Session> {
        self.session
            .lock()
            .clone()
            .ok_or_else(|| HttpError::session_not_started().into())
    }

    pub fn has_session(&self) -> bool {
        self.session.lock().is_some()
    }

    pub fn set_session(&self, session: Session) {
        *self.session.lock() = Some(session);
    }

    /// 구조화된 에러를 만듭니다. 메시지가 비어 있으면 표준 사유 문구를 씁니다.
    pub fn error(&self, code: u16, message: impl fmt::Display) -> Error {
        let msg = message.to_string();
        if msg.is_empty() {
            HttpError::new(code, reason_phrase(code)).into()
        } else {
            HttpError::new(code, msg).into()
        }
    }

    // ---- request ----

    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn uri(&self) -> &Uri {
        &self.request.uri
    }

    pub fn path(&self) -> &str {
        self.request.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.request.uri.query()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.request.remote_addr
    }

    /// 클라이언트 IP. 주소를 모르면 빈 문자열입니다.
    pub fn user_ip(&self) -> String {
        self.request
            .remote_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default()
    }

    /// 포트를 뗀 요청 호스트
    pub fn host(&self) -> String {
        let raw = self
            .request_header(header::HOST.as_str())
            .or_else(|| self.request.uri.authority().map(|a| a.as_str()))
            .unwrap_or_default();
        strip_port(raw).to_string()
    }

    /// TLS 리스너로 들어왔거나 프록시가 `X-Forwarded-Proto: https`를 붙인 요청
    pub fn is_https(&self) -> bool {
        self.request.https
            || self
                .request_header("x-forwarded-proto")
                .map(|proto| proto.eq_ignore_ascii_case("https"))
                .unwrap_or(false)
    }

    pub fn request_headers(&self) -> &HeaderMap {
        &self.request.headers
    }

    pub fn request_header(&self, name: &str) -> Option<&str> {
        self.request.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// 경로 파라미터, 없으면 같은 이름의 쿼리 파라미터
    pub fn param(&self, name: &str) -> Option<String> {
        if let Some(value) = self.request.params.get(name) {
            return Some(value.clone());
        }
        let query = self.request.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.request
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim_matches('"').to_string())
    }

    pub fn accept(&self) -> &str {
        self.request_header(header::ACCEPT.as_str()).unwrap_or_default()
    }

    pub fn accepts_json(&self) -> bool {
        self.accepts_type(APPLICATION_JSON)
    }

    pub fn accepts_html(&self) -> bool {
        self.accepts_type("text/html")
    }

    pub fn accepts_plain_text(&self) -> bool {
        self.accepts_type("text/plain")
    }

    fn accepts_type(&self, mime: &str) -> bool {
        self.accept().split(',').any(|range| {
            let media = range.split(';').next().unwrap_or_default().trim();
            media == "*/*" || media.eq_ignore_ascii_case(mime)
        })
    }

    /// 요청 본문. 최대 [`MAX_BODY_BYTES`]까지 읽습니다.
    pub async fn body(&self) -> Result<Bytes> {
        self.request.body().await
    }

    pub async fn unmarshal_body<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.body().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    // ---- response ----

    /// 기록된 상태 코드. 아직 기록되지 않았으면 200입니다.
    pub fn status(&self) -> u16 {
        self.frame
            .lock()
            .status
            .map(|s| s.as_u16())
            .unwrap_or(200)
    }

    /// 상태 코드가 이미 확정됐는지 여부
    pub fn status_written(&self) -> bool {
        self.frame.lock().status.is_some()
    }

    /// 본문이 한 번이라도 작성됐는지 여부
    pub fn is_written(&self) -> bool {
        self.frame.lock().body_written
    }

    /// 상태 코드를 기록하고 확정합니다. 본문을 쓰기 전에 호출해야 하며,
    /// 이미 확정된 뒤의 호출은 무시됩니다.
    pub fn with_status(&self, code: u16) -> &Self {
        let Ok(status) = StatusCode::from_u16(code) else {
            warn!(code, request_id = %self.id, "잘못된 상태 코드 무시");
            return self;
        };

        let mut frame = self.frame.lock();
        match frame.status {
            Some(current) => {
                warn!(
                    current = current.as_u16(),
                    ignored = code,
                    request_id = %self.id,
                    "상태 코드가 이미 기록됨"
                );
            }
            None => frame.status = Some(status),
        }
        self
    }

    /// 기록된 상태 코드를 덮어씁니다. 본문이 아직 없을 때 에러 응답에만 씁니다.
    pub(crate) fn replace_status(&self, status: StatusCode) {
        self.frame.lock().status = Some(status);
    }

    pub fn response_header(&self, name: &str) -> Option<String> {
        self.frame
            .lock()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn with_header(&self, name: HeaderName, value: HeaderValue) -> &Self {
        self.frame.lock().headers.insert(name, value);
        self
    }

    /// 응답 헤더를 설정합니다. 같은 이름의 기존 값은 대체됩니다.
    pub fn set_header(&self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_header(name, value)?;
        self.frame.lock().headers.insert(name, value);
        Ok(())
    }

    pub fn add_header(&self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_header(name, value)?;
        self.frame.lock().headers.append(name, value);
        Ok(())
    }

    pub fn set_content_type(&self, content_type: &str) -> Result<()> {
        self.set_header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// 요청 호스트 도메인으로 `Path=/` 쿠키를 설정합니다.
    pub fn set_cookie(&self, name: &str, value: &str, max_age: Duration) -> Result<()> {
        let mut cookie = format!(
            "{}={}; Max-Age={}; Path=/",
            name,
            value,
            max_age.as_secs()
        );
        let host = self.host();
        if !host.is_empty() {
            cookie.push_str("; Domain=");
            cookie.push_str(&host);
        }
        cookie.push_str("; HttpOnly; SameSite=Lax");
        if self.is_https() {
            cookie.push_str("; Secure");
        }
        self.add_header(header::SET_COOKIE.as_str(), &cookie)
    }

    /// 본문을 이어 씁니다. 상태 코드가 없으면 200으로 확정합니다.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut frame = self.frame.lock();
        if frame.status.is_none() {
            frame.status = Some(StatusCode::OK);
        }
        frame.body.extend_from_slice(bytes);
        frame.body_written = true;
        Ok(())
    }

    fn send(&self, content_type: &'static str, bytes: &[u8]) -> Result<()> {
        self.with_header(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.write(bytes)
    }

    pub fn send_string(&self, s: &str) -> Result<()> {
        self.send(TEXT_PLAIN, s.as_bytes())
    }

    pub fn send_html(&self, s: &str) -> Result<()> {
        self.send(TEXT_HTML, s.as_bytes())
    }

    pub fn send_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let encoded = serde_json::to_vec(value)?;
        self.send(APPLICATION_JSON, &encoded)
    }

    /// 파일 이름 확장자로 MIME 타입을 정하고 첨부 파일로 내려줍니다.
    pub fn send_attachment(&self, filename: &str, contents: &[u8]) -> Result<()> {
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', "\\\""));
        self.set_header(header::CONTENT_TYPE.as_str(), mime.as_ref())?;
        self.set_header(header::CONTENT_DISPOSITION.as_str(), &disposition)?;
        self.write(contents)
    }
}

impl fmt::Debug for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctx")
            .field("id", &self.id)
            .field("method", &self.request.method)
            .field("uri", &self.request.uri)
            .finish_non_exhaustive()
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| HttpError::new(500, format!("invalid header name: {}", name)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|_| HttpError::new(500, format!("invalid value for header {}", name)))?;
    Ok((header_name, header_value))
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // [::1]:8080
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::middleware::HandlerChain;

    fn ctx_for(info: RequestInfo) -> Ctx {
        Ctx::new(info, HandlerChain::new().freeze(), Scope::new())
    }

    fn get(uri: &'static str) -> RequestInfo {
        RequestInfo::new(Method::GET, Uri::from_static(uri))
    }

    #[test]
    fn test_accepts_media_ranges() {
        let ctx = ctx_for(get("/").with_header(
            header::ACCEPT,
            HeaderValue::from_static("text/html;q=0.9, application/json"),
        ));
        assert!(ctx.accepts_json());
        assert!(ctx.accepts_html());
        assert!(!ctx.accepts_plain_text());

        let any = ctx_for(get("/").with_header(header::ACCEPT, HeaderValue::from_static("*/*")));
        assert!(any.accepts_plain_text());

        let none = ctx_for(get("/"));
        assert!(!none.accepts_json());
    }

    #[test]
    fn test_param_falls_back_to_query() {
        let mut params = HashMap::new();
        params.insert("id".to_string(), "7".to_string());
        let ctx = ctx_for(get("/users/7?id=9&name=a%20b").with_params(params));

        assert_eq!(ctx.param("id").as_deref(), Some("7"));
        assert_eq!(ctx.param("name").as_deref(), Some("a b"));
        assert_eq!(ctx.param("missing"), None);
    }

    #[test]
    fn test_cookie_lookup() {
        let ctx = ctx_for(get("/").with_header(
            header::COOKIE,
            HeaderValue::from_static("a=1; martian_session_id=abc; b=\"2\""),
        ));
        assert_eq!(ctx.cookie("martian_session_id").as_deref(), Some("abc"));
        assert_eq!(ctx.cookie("b").as_deref(), Some("2"));
        assert_eq!(ctx.cookie("c"), None);
    }

    #[test]
    fn test_status_is_written_once() {
        let ctx = ctx_for(get("/"));
        assert_eq!(ctx.status(), 200);
        assert!(!ctx.status_written());

        ctx.with_status(201);
        ctx.with_status(500);
        assert_eq!(ctx.status(), 201);

        let fresh = ctx_for(get("/"));
        fresh.send_string("ok").unwrap();
        fresh.with_status(404);
        assert_eq!(fresh.status(), 200);
    }

    #[test]
    fn test_clones_share_frame() {
        let ctx = ctx_for(get("/"));
        let copy = ctx.clone();
        copy.with_status(418);
        assert_eq!(ctx.status(), 418);

        let scoped = ctx.with_scope(Scope::new());
        scoped.send_string("tea").unwrap();
        assert!(ctx.is_written());
    }

    #[test]
    fn test_fork_is_isolated_until_adopted() {
        let ctx = ctx_for(get("/"));
        let forked = ctx.fork(Scope::new());
        forked.with_status(202);
        assert!(!ctx.status_written());

        ctx.adopt(&forked);
        assert_eq!(ctx.status(), 202);
    }

    #[test]
    fn test_set_cookie_attributes() {
        let ctx = ctx_for(
            get("/")
                .with_header(header::HOST, HeaderValue::from_static("example.com:8080"))
                .with_header(
                    HeaderName::from_static("x-forwarded-proto"),
                    HeaderValue::from_static("https"),
                ),
        );
        ctx.set_cookie("sid", "abc", Duration::from_secs(60)).unwrap();
        assert_eq!(
            ctx.response_header("set-cookie").as_deref(),
            Some("sid=abc; Max-Age=60; Path=/; Domain=example.com; HttpOnly; SameSite=Lax; Secure")
        );
    }

    #[test]
    fn test_error_message_defaults_to_reason() {
        let ctx = ctx_for(get("/"));
        let err = ctx.error(400, "");
        assert_eq!(err.to_http(), HttpError::new(400, "Bad Request"));

        let err = ctx.error(422, std::io::Error::new(std::io::ErrorKind::Other, "bad input"));
        assert_eq!(err.to_http(), HttpError::new(422, "bad input"));
    }

    #[test]
    fn test_session_not_started() {
        let ctx = ctx_for(get("/"));
        let err = ctx.session().unwrap_err();
        assert_eq!(err.to_http(), HttpError::session_not_started());
    }

    #[test]
    fn test_send_attachment_headers() {
        let ctx = ctx_for(get("/"));
        ctx.send_attachment("report.csv", b"a,b").unwrap();
        assert_eq!(ctx.response_header("content-type").as_deref(), Some("text/csv"));
        assert_eq!(
            ctx.response_header("content-disposition").as_deref(),
            Some("attachment; filename=\"report.csv\"")
        );
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:80"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:8080"), "::1");
    }

    #[tokio::test]
    async fn test_unmarshal_body() {
        #[derive(serde::Deserialize)]
        struct Payload {
            name: String,
        }
        let ctx = ctx_for(RequestInfo::new(Method::POST, Uri::from_static("/")).with_body(r#"{"name":"ann"}"#));
        let payload: Payload = ctx.unmarshal_body().await.unwrap();
        assert_eq!(payload.name, "ann");
        // 두 번째 읽기도 같은 본문
        assert_eq!(ctx.body().await.unwrap(), Bytes::from_static(br#"{"name":"ann"}"#));
    }
}
