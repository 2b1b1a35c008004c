use std::collections::HashMap;
use std::time::Duration;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct Visitor {
    count: u32,
    window_at: Instant,
}

/// 검사 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited {
        /// 현재 윈도우가 끝날 때까지 남은 시간
        retry_after: Duration,
    },
}

/// 고정 윈도우 카운터 저장소
///
/// 방문자의 윈도우가 `window`보다 오래되면 다음 요청에서 카운터를 1로 다시 시작합니다.
#[derive(Debug)]
pub struct FixedWindowStore {
    max: u32,
    window: Duration,
    visitors: Mutex<HashMap<String, Visitor>>,
}

impl FixedWindowStore {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            visitors: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn check(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut visitors = self.visitors.lock();

        match visitors.get_mut(key) {
            Some(visitor) if now.duration_since(visitor.window_at) <= self.window => {
                visitor.count = visitor.count.saturating_add(1);
                if visitor.count > self.max {
                    let elapsed = now.duration_since(visitor.window_at);
                    RateLimitDecision::Limited {
                        retry_after: self.window.saturating_sub(elapsed),
                    }
                } else {
                    RateLimitDecision::Allowed
                }
            }
            _ => {
                visitors.insert(key.to_string(), Visitor { count: 1, window_at: now });
                RateLimitDecision::Allowed
            }
        }
    }

    /// 윈도우가 지난 방문자를 제거하고 제거한 수를 반환합니다.
    pub fn cleanup(&self, now: Instant) -> usize {
        let mut visitors = self.visitors.lock();
        let before = visitors.len();
        visitors.retain(|_, v| now.duration_since(v.window_at) <= self.window);
        let removed = before - visitors.len();
        if removed > 0 {
            debug!(removed, remaining = visitors.len(), "오래된 방문자 정리");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.visitors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
