use std::future::Future;
use async_trait::async_trait;
use crate::context::Ctx;
use crate::error::Result;

/// 핸들러 트레이트
///
/// 라우트 핸들러와 미들웨어가 같은 인터페이스를 씁니다. 미들웨어는
/// `ctx.next().await`로 체인의 나머지를 실행하고 그 결과를 받아 후처리합니다.
/// `next`를 호출하지 않으면 체인은 거기서 멈춥니다.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, ctx: Ctx) -> Result<()>;

    /// 로그에 쓰일 이름
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Ctx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, ctx: Ctx) -> Result<()> {
        (self)(ctx).await
    }
}
