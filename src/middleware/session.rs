use std::sync::Arc;
use async_trait::async_trait;
use tracing::{debug, error};
use crate::cache::CacheService;
use crate::context::Ctx;
use crate::error::{Error, Result};
use crate::session::{Session, SessionConfig};
use super::Handler;

/// 세션 미들웨어
///
/// 시작 시 쿠키의 세션 ID를 쓰거나 새로 발급하고, 캐시에 저장된 데이터가 있으면 불러옵니다.
/// 체인이 끝난 뒤 데이터가 바뀌었을 때만 한 번 저장하고 clean 상태로 돌립니다.
pub struct SessionMiddleware {
    cache: Arc<dyn CacheService>,
    config: SessionConfig,
}

impl SessionMiddleware {
    pub fn new(cache: Arc<dyn CacheService>, config: SessionConfig) -> Self {
        Self { cache, config }
    }
}

fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 128 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// 요청에 세션을 시작합니다. 이미 시작돼 있으면 아무것도 하지 않습니다.
///
/// 자동 시작을 끈 경우 로그인 핸들러 등에서 직접 호출합니다.
pub async fn start_session(ctx: &Ctx, cache: &dyn CacheService, config: &SessionConfig) -> Result<Session> {
    if let Ok(session) = ctx.session() {
        return Ok(session);
    }

    let session = match ctx.cookie(&config.cookie_name).filter(|id| is_valid_session_id(id)) {
        Some(id) => Session::with_id(id),
        None => {
            let session = Session::new();
            ctx.set_cookie(&config.cookie_name, session.id(), config.ttl())?;
            debug!(session_id = %session.id(), request_id = %ctx.id(), "새 세션 발급");
            session
        }
    };

    let key = session.key_id();
    match cache.get_bytes(ctx.scope(), &key).await {
        Ok(raw) => session.data().load_json(&raw)?,
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    ctx.set_session(session.clone());
    Ok(session)
}

async fn persist(ctx: &Ctx, cache: &dyn CacheService, config: &SessionConfig) -> Result<()> {
    let Ok(session) = ctx.session() else {
        return Ok(());
    };
    if !session.data().is_dirty() {
        return Ok(());
    }

    let encoded = session.data().to_json()?;
    cache
        .set_bytes(ctx.scope(), &session.key_id(), encoded, config.ttl())
        .await?;
    session.data().set_clean();
    Ok(())
}

#[async_trait]
impl Handler for SessionMiddleware {
    async fn handle(&self, ctx: Ctx) -> Result<()> {
        if self.config.autostart {
            start_session(&ctx, self.cache.as_ref(), &self.config).await?;
        }

        let result = ctx.next().await;

        match (persist(&ctx, self.cache.as_ref(), &self.config).await, result) {
            (Ok(()), result) => result,
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(handler_err)) => {
                error!(request_id = %ctx.id(), error = %e, "세션 저장 실패");
                Err(Error::Other(format!("{}; {}", e, handler_err).into()))
            }
        }
    }

    fn name(&self) -> &str {
        "session"
    }
}
