use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate Limit 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// 윈도우당 최대 요청 수
    #[serde(default = "default_max")]
    pub max: u32,

    /// 윈도우 길이(초)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// 오래된 방문자 정리 주기(초). 0이면 윈도우의 두 배
    #[serde(default)]
    pub cleanup_interval_secs: u64,
}

fn default_max() -> u32 {
    60 // 기본값: 분당 60 요청
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max: default_max(),
            window_secs: default_window_secs(),
            cleanup_interval_secs: 0,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        match self.cleanup_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max == 0 {
            return Err("rate_limit.max는 0보다 커야 합니다".to_string());
        }
        if self.window_secs == 0 {
            return Err("rate_limit.window_secs는 0보다 커야 합니다".to_string());
        }
        Ok(())
    }
}
