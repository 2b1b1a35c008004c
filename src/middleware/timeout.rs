use std::time::Duration;
use async_trait::async_trait;
use tokio_util::task::AbortOnDropHandle;
use tracing::warn;
use crate::context::Ctx;
use crate::error::{Error, HttpError, Result};
use super::Handler;

/// 요청 제한 시간 미들웨어
///
/// 마감 시간이 걸린 자식 범위로 체인의 나머지를 별도 태스크에서 실행합니다.
/// 태스크는 복사된 응답 프레임에 쓰고, 제한 시간 안에 끝난 경우에만 그 프레임을 채택합니다.
/// 마감되면 범위를 취소하고 태스크를 중단한 뒤 503을 반환하므로
/// 늦게 끝난 핸들러가 응답을 다시 쓰는 일은 없습니다.
///
/// 요청 future가 도중에 drop되어도 태스크는 함께 중단됩니다.
/// 태스크 안의 패닉은 그대로 다시 발생시켜 바깥 Recovery가 처리하게 합니다.
#[derive(Debug, Clone, Copy)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl Handler for Timeout {
    async fn handle(&self, ctx: Ctx) -> Result<()> {
        let scope = ctx.scope().with_timeout(self.duration);
        let forked = ctx.fork(scope.clone());

        let task_ctx = forked.clone();
        let mut task = AbortOnDropHandle::new(tokio::spawn(async move { task_ctx.next().await }));

        tokio::select! {
            joined = &mut task => match joined {
                Ok(result) => {
                    ctx.adopt(&forked);
                    result
                }
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => Err(Error::Other(Box::new(e))),
            },
            reason = scope.done() => {
                scope.cancel();
                task.abort();
                warn!(
                    request_id = %ctx.id(),
                    path = %ctx.path(),
                    timeout_ms = self.duration.as_millis() as u64,
                    reason = %reason,
                    "요청 제한 시간 초과"
                );
                Err(HttpError::request_timed_out().into())
            }
        }
    }

    fn name(&self) -> &str {
        "timeout"
    }
}
