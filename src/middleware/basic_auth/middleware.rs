use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hyper::header::{self, HeaderValue};
use tracing::debug;
use crate::context::Ctx;
use crate::error::{Error, HttpError, Result};
use crate::middleware::Handler;
use super::auth::{Authenticator, CredentialAuthenticator};
use super::config::BasicAuthConfig;

/// Basic 인증 미들웨어
///
/// 헤더가 없거나 자격증명이 틀리면 401, 형식이 잘못되면 400을 반환하며
/// 모든 실패 응답에 `WWW-Authenticate`를 붙입니다.
pub struct BasicAuth {
    challenge: HeaderValue,
    authenticator: Box<dyn Authenticator>,
}

impl BasicAuth {
    /// 단일 사용자
    pub fn new(username: &str, password: &str) -> Self {
        Self::with_authenticator(
            "Restricted",
            Box::new(CredentialAuthenticator::new([(username, password)])),
        )
    }

    pub fn from_config(config: &BasicAuthConfig) -> Self {
        Self::with_authenticator(&config.realm, Box::new(CredentialAuthenticator::from_config(config)))
    }

    pub fn with_authenticator(realm: &str, authenticator: Box<dyn Authenticator>) -> Self {
        let challenge = HeaderValue::try_from(format!("Basic realm=\"{}\"", realm.replace('"', "")))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic realm=\"Restricted\""));
        Self { challenge, authenticator }
    }

    /// Authorization 헤더에서 자격증명을 추출합니다.
    fn extract_credentials(header: &str) -> std::result::Result<(String, String), u16> {
        // Basic <base64 알파벳>
        let token = header.strip_prefix("Basic ").ok_or(400u16)?;
        let valid = token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='));
        if !valid {
            return Err(400);
        }

        let decoded = BASE64.decode(token).map_err(|_| 400u16)?;
        let pair = String::from_utf8(decoded).map_err(|_| 400u16)?;
        let (user, pass) = pair.split_once(':').ok_or(400u16)?;
        Ok((user.to_string(), pass.to_string()))
    }

    fn reject(&self, ctx: &Ctx, code: u16) -> Error {
        ctx.with_header(header::WWW_AUTHENTICATE, self.challenge.clone());
        HttpError::from_status(code).into()
    }
}

#[async_trait]
impl Handler for BasicAuth {
    async fn handle(&self, ctx: Ctx) -> Result<()> {
        let Some(auth) = ctx.request_header(header::AUTHORIZATION.as_str()).filter(|a| !a.is_empty()) else {
            return Err(self.reject(&ctx, 401));
        };

        let (username, password) = match Self::extract_credentials(auth) {
            Ok(pair) => pair,
            Err(code) => return Err(self.reject(&ctx, code)),
        };

        if !self.authenticator.verify_credentials(&username, &password) {
            debug!(user = %username, request_id = %ctx.id(), "Basic 인증 실패");
            return Err(self.reject(&ctx, 401));
        }

        ctx.next().await
    }

    fn name(&self) -> &str {
        "basic-auth"
    }
}
