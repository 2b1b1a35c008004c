use std::sync::Arc;
use async_trait::async_trait;
use tokio::time::Instant;
use crate::context::Ctx;
use crate::error::Result;
use crate::logging::{RequestLog, RequestLogger, TracingLogger};
use super::Handler;

/// 요청 로그 미들웨어
///
/// 체인이 끝난 뒤 최종 상태 코드를 정합니다. 에러가 구조화된 값이면 그 코드를,
/// 아니면 기록된 상태가 200일 때 500을 씁니다.
pub struct Log {
    logger: Arc<dyn RequestLogger>,
}

impl Log {
    pub fn new(logger: Arc<dyn RequestLogger>) -> Self {
        Self { logger }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self::new(Arc::new(TracingLogger))
    }
}

#[async_trait]
impl Handler for Log {
    async fn handle(&self, ctx: Ctx) -> Result<()> {
        let started = Instant::now();
        let result = ctx.next().await;

        let mut status = ctx.status();
        if let Err(e) = &result {
            match e.as_http() {
                Some(http) => status = http.status().as_u16(),
                None if status == 200 => status = 500,
                None => {}
            }
        }

        let mut entry = RequestLog::new(ctx.id()).with_duration(started.elapsed());
        entry.method = ctx.method().to_string();
        entry.path = ctx.path().to_string();
        entry.client_ip = ctx.user_ip();
        entry.session_id = ctx.session().ok().map(|s| s.id().to_string());
        entry.status_code = status;
        if let Err(e) = &result {
            entry = entry.with_error(e);
        }

        self.logger.log(&entry);
        result
    }

    fn name(&self) -> &str {
        "log"
    }
}
