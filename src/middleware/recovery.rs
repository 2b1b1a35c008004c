use std::any::Any;
use std::panic::AssertUnwindSafe;
use async_trait::async_trait;
use futures_util::FutureExt;
use tracing::error;
use crate::context::Ctx;
use crate::error::{Error, HttpError, Result};
use super::Handler;

/// 패닉 복구 미들웨어
///
/// 체인의 나머지에서 발생한 패닉을 잡아 `{500, "panic: <값>"}` 에러로 바꿉니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recovery;

impl Recovery {
    pub fn new() -> Self {
        Self
    }
}

/// 패닉 값을 문자열로 바꿉니다.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        return s.to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    if let Some(e) = payload.downcast_ref::<HttpError>() {
        return e.to_string();
    }
    if let Some(e) = payload.downcast_ref::<Error>() {
        return e.to_string();
    }
    if let Some(e) = payload.downcast_ref::<Box<dyn std::error::Error + Send + Sync>>() {
        return e.to_string();
    }
    if let Some(e) = payload.downcast_ref::<std::io::Error>() {
        return e.to_string();
    }

    macro_rules! numeric {
        ($($t:ty),*) => {
            $(if let Some(n) = payload.downcast_ref::<$t>() {
                return n.to_string();
            })*
        };
    }
    numeric!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char);

    "unknown panic".to_string()
}

#[async_trait]
impl Handler for Recovery {
    async fn handle(&self, ctx: Ctx) -> Result<()> {
        match AssertUnwindSafe(ctx.next()).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    request_id = %ctx.id(),
                    path = %ctx.path(),
                    panic = %message,
                    "핸들러 패닉 복구"
                );
                Err(HttpError::new(500, format!("panic: {}", message)).into())
            }
        }
    }

    fn name(&self) -> &str {
        "recovery"
    }
}
