use async_trait::async_trait;
use hyper::header::{self, HeaderValue};
use hyper::Method;
use tracing::debug;
use crate::context::Ctx;
use crate::error::{HttpError, Result};
use crate::middleware::Handler;
use super::config::CorsConfig;

/// CORS 미들웨어
///
/// 모든 응답에 Allow-Origin을 붙이고, OPTIONS preflight에는 204로 응답한 뒤 체인을 멈춥니다.
#[derive(Debug, Clone)]
pub struct Cors {
    origin: HeaderValue,
    methods: HeaderValue,
    headers: HeaderValue,
}

impl Cors {
    pub fn new(config: &CorsConfig) -> Result<Self> {
        let value = |name: &str, raw: String| {
            HeaderValue::try_from(raw)
                .map_err(|_| HttpError::new(500, format!("invalid CORS {} value", name)))
        };

        Ok(Self {
            origin: value("origin", config.origin.clone())?,
            methods: value("methods", config.allow_methods.join(", "))?,
            headers: value("headers", config.allow_headers.join(", "))?,
        })
    }
}

#[async_trait]
impl Handler for Cors {
    async fn handle(&self, ctx: Ctx) -> Result<()> {
        ctx.with_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.origin.clone());

        if ctx.method() == Method::OPTIONS {
            debug!(path = %ctx.path(), "CORS preflight 응답");
            ctx.with_header(header::ACCESS_CONTROL_ALLOW_METHODS, self.methods.clone())
                .with_header(header::ACCESS_CONTROL_ALLOW_HEADERS, self.headers.clone())
                .with_status(204);
            return Ok(());
        }

        ctx.next().await
    }

    fn name(&self) -> &str {
        "cors"
    }
}
