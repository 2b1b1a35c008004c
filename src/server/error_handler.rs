use std::sync::Arc;
use tracing::{debug, error};
use crate::context::Ctx;
use crate::error::{Error, HttpError};

/// 체인이 반환한 에러를 응답으로 바꾸는 함수
pub type ErrorHandler = Arc<dyn Fn(&Ctx, &Error) + Send + Sync>;

/// 기본 에러 핸들러
///
/// 구조화된 에러는 그대로, 그 외의 에러는 `{500, 원래 메시지}`로 응답합니다.
/// Accept 헤더에 따라 JSON, 일반 텍스트, HTML 순으로 형식을 고르며
/// 상태 코드와 메시지는 형식과 관계없이 같습니다.
/// 이미 본문이 쓰인 응답은 건드리지 않습니다.
pub fn default_error_handler(ctx: &Ctx, err: &Error) {
    if ctx.is_written() {
        debug!(request_id = %ctx.id(), error = %err, "응답이 이미 작성되어 에러 응답을 생략합니다");
        return;
    }

    let e = err.to_http();
    ctx.replace_status(e.status());
    let result = if ctx.accepts_json() {
        ctx.send_json(&e)
    } else if ctx.accepts_plain_text() {
        ctx.send_string(&e.msg)
    } else {
        ctx.send_html(&error_view(&e))
    };

    if let Err(write_err) = result {
        error!(request_id = %ctx.id(), error = %write_err, "에러 응답 작성 실패");
    }
}

pub(crate) fn default_handler() -> ErrorHandler {
    Arc::new(default_error_handler)
}

/// HTML 에러 페이지
pub fn error_view(e: &HttpError) -> String {
    let msg = escape_html(&e.msg);
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{code} {msg}</title>\n</head>\n<body>\n\
         <main>\n<h1>{code}</h1>\n<p>{msg}</p>\n</main>\n</body>\n</html>\n",
        code = e.code,
        msg = msg,
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
    use http_body_util::BodyExt;
    use crate::context::RequestInfo;
    use crate::scope::Scope;

    fn ctx_accepting(accept: Option<&'static str>) -> Ctx {
        let mut info = RequestInfo::new(hyper::Method::GET, "/x".parse().unwrap());
        if let Some(accept) = accept {
            info = info.with_header(ACCEPT, HeaderValue::from_static(accept));
        }
        Ctx::new(info, Arc::from(Vec::new()), Scope::new())
    }

    async fn render(accept: Option<&'static str>, err: Error) -> (u16, String, String) {
        let ctx = ctx_accepting(accept);
        default_error_handler(&ctx, &err);
        let response = ctx.take_response();
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_content_negotiation() {
        let (status, ct, body) = render(Some("application/json"), HttpError::not_found().into()).await;
        assert_eq!(status, 404);
        assert!(ct.starts_with("application/json"));
        assert_eq!(body, r#"{"code":404,"msg":"Resource not found"}"#);

        let (status, ct, body) = render(Some("text/plain"), HttpError::not_found().into()).await;
        assert_eq!(status, 404);
        assert!(ct.starts_with("text/plain"));
        assert_eq!(body, "Resource not found");

        let (status, ct, body) = render(None, HttpError::not_found().into()).await;
        assert_eq!(status, 404);
        assert!(ct.starts_with("text/html"));
        assert!(body.contains("<h1>404</h1>"));
        assert!(body.contains("Resource not found"));
    }

    #[tokio::test]
    async fn test_unstructured_error_becomes_500() {
        let err = Error::Body("broken pipe".to_string());
        let (status, _, body) = render(Some("text/plain"), err).await;
        assert_eq!(status, 500);
        assert!(body.contains("broken pipe"));
    }

    #[tokio::test]
    async fn test_out_of_range_code_answers_500() {
        let cases = vec![
            (Some("application/json"), r#"{"code":500,"msg":"broken"}"#),
            (Some("text/plain"), "broken"),
        ];

        for (accept, expected) in cases {
            let (status, _, body) = render(accept, HttpError::new(1000, "broken").into()).await;
            assert_eq!(status, 500);
            assert_eq!(body, expected);
        }

        let (status, _, body) = render(None, HttpError::new(42, "tiny").into()).await;
        assert_eq!(status, 500);
        assert!(body.contains("<h1>500</h1>"));
    }

    #[tokio::test]
    async fn test_recorded_status_is_replaced_by_error_code() {
        let ctx = ctx_accepting(Some("text/plain"));
        ctx.with_status(201);
        default_error_handler(&ctx, &HttpError::new(409, "conflict").into());

        let response = ctx.take_response();
        assert_eq!(response.status().as_u16(), 409);
    }

    #[tokio::test]
    async fn test_written_response_is_kept() {
        let ctx = ctx_accepting(Some("text/plain"));
        ctx.send_string("partial").unwrap();
        default_error_handler(&ctx, &HttpError::not_found().into());

        let response = ctx.take_response();
        assert_eq!(response.status().as_u16(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"partial");
    }

    #[test]
    fn test_error_view_escapes_message() {
        let view = error_view(&HttpError::new(400, "<script>"));
        assert!(view.contains("&lt;script&gt;"));
        assert!(!view.contains("<script>"));
    }
}
