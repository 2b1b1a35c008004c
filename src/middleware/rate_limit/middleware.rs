use std::sync::{Arc, Weak};
use std::time::Duration;
use async_trait::async_trait;
use hyper::header::{self, HeaderValue};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use crate::context::Ctx;
use crate::error::{HttpError, Result};
use crate::middleware::Handler;
use super::config::RateLimitConfig;
use super::store::{FixedWindowStore, RateLimitDecision};

/// Rate Limit 미들웨어
///
/// 인스턴스마다 오래된 방문자를 정리하는 작업이 하나 돌며, drop 시 중단됩니다.
pub struct RateLimit {
    store: Arc<FixedWindowStore>,
    cleanup: CancellationToken,
}

impl RateLimit {
    /// 정리 주기는 윈도우의 두 배입니다.
    pub fn new(max: u32, window: Duration) -> Self {
        Self::with_cleanup_interval(max, window, window * 2)
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        let window = config.window();
        let interval = config.cleanup_interval().unwrap_or(window * 2);
        Self::with_cleanup_interval(config.max, window, interval)
    }

    pub fn with_cleanup_interval(max: u32, window: Duration, interval: Duration) -> Self {
        let store = Arc::new(FixedWindowStore::new(max, window));
        let cleanup = CancellationToken::new();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) if !interval.is_zero() => {
                handle.spawn(run_cleanup(Arc::downgrade(&store), interval, cleanup.clone()));
            }
            _ => warn!("방문자 정리 작업 없이 Rate Limit을 생성합니다"),
        }

        Self { store, cleanup }
    }

    pub fn store(&self) -> &FixedWindowStore {
        &self.store
    }
}

impl Drop for RateLimit {
    fn drop(&mut self) {
        self.cleanup.cancel();
    }
}

async fn run_cleanup(store: Weak<FixedWindowStore>, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let Some(store) = store.upgrade() else { break };
                store.cleanup(Instant::now());
            }
        }
    }
    debug!("방문자 정리 작업 종료");
}

#[async_trait]
impl Handler for RateLimit {
    async fn handle(&self, ctx: Ctx) -> Result<()> {
        let ip = ctx.user_ip();

        match self.store.check(&ip, Instant::now()) {
            RateLimitDecision::Allowed => ctx.next().await,
            RateLimitDecision::Limited { retry_after } => {
                debug!(client_ip = %ip, request_id = %ctx.id(), "요청 속도 제한 초과");
                // 올림한 초 단위
                let secs = retry_after.as_millis().div_ceil(1000) as u64;
                ctx.with_header(header::RETRY_AFTER, HeaderValue::from(secs));
                Err(HttpError::rate_limit_exceeded().into())
            }
        }
    }

    fn name(&self) -> &str {
        "rate-limit"
    }
}
