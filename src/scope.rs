//! 요청 단위 취소/마감 범위
//!
//! 요청마다 하나의 루트 범위가 만들어지고, Timeout 미들웨어처럼 마감 시간이
//! 필요한 곳에서는 자식 범위를 파생해 나머지 체인에 넘깁니다.
//! 캐시 연산을 포함한 모든 하위 작업은 이 범위를 보고 빠르게 실패해야 합니다.

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    /// 명시적으로 취소됨 (클라이언트 연결 끊김, 서버 강제 종료, 상위 범위 취소)
    Cancelled,
    /// 마감 시간 경과
    DeadlineExceeded,
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::Cancelled => write!(f, "scope cancelled"),
            ScopeError::DeadlineExceeded => write!(f, "scope deadline exceeded"),
        }
    }
}

impl std::error::Error for ScopeError {}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// 취소 토큰을 공유하면서 마감 시간이 `timeout` 이내인 자식 범위를 만듭니다.
    /// 상위 범위의 마감이 더 이르면 그 값을 유지합니다.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(current) if current < candidate => current,
            _ => candidate,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// 상위가 취소되면 함께 취소되지만, 자신의 취소는 상위로 전파되지 않습니다.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// 주어진 토큰이 취소되면 함께 취소되는 루트 범위
    pub fn within(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            deadline: None,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// drop될 때 이 범위를 취소하는 guard
    pub fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 이미 끝난 범위라면 그 이유를 반환합니다.
    pub fn err(&self) -> Option<ScopeError> {
        if self.token.is_cancelled() {
            return Some(ScopeError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ScopeError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// 범위가 취소되거나 마감될 때까지 기다립니다.
    pub async fn done(&self) -> ScopeError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => ScopeError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => ScopeError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ScopeError::Cancelled
            }
        }
    }
}
