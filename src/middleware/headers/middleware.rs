use async_trait::async_trait;
use hyper::header::{HeaderName, HeaderValue};
use crate::context::Ctx;
use crate::error::Result;
use crate::middleware::Handler;

/// 모든 응답에 붙는 고정 보안 헤더
pub const SECURITY_HEADERS: [(&str, &str); 6] = [
    // MIME 타입 스니핑 방지
    ("x-content-type-options", "nosniff"),
    // 클릭재킹 방지
    ("x-frame-options", "DENY"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "geolocation=(), camera=(), microphone=()"),
    ("content-security-policy", "default-src 'self'"),
    ("cross-origin-opener-policy", "same-origin"),
];

/// 보안 헤더 미들웨어
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityHeaders;

impl SecurityHeaders {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for SecurityHeaders {
    async fn handle(&self, ctx: Ctx) -> Result<()> {
        for (name, value) in SECURITY_HEADERS {
            ctx.with_header(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        ctx.next().await
    }

    fn name(&self) -> &str {
        "security-headers"
    }
}
