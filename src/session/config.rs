use std::env;
use std::time::Duration;
use serde::Deserialize;
use crate::settings::{parse_env_var, SettingsError};

/// 세션 쿠키 설정
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// 쿠키 Max-Age 및 캐시 TTL (초)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// 모든 요청에서 세션을 자동으로 시작할지 여부
    #[serde(default = "default_autostart")]
    pub autostart: bool,
}

fn default_cookie_name() -> String { "martian_session_id".to_string() }
fn default_ttl_secs() -> u64 { 48 * 60 * 60 }
fn default_autostart() -> bool { true }

impl SessionConfig {
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self {
            cookie_name: env::var("MARTIAN_SESSION_COOKIE").unwrap_or_else(|_| default_cookie_name()),
            ttl_secs: parse_env_var("MARTIAN_SESSION_TTL_SECS", default_ttl_secs)?,
            autostart: parse_env_var("MARTIAN_SESSION_AUTOSTART", default_autostart)?,
        })
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let valid = !self.cookie_name.is_empty()
            && self.cookie_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SettingsError::invalid_value(
                "session.cookie_name",
                format!("쿠키 이름에 쓸 수 없는 문자가 있습니다: {}", self.cookie_name),
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_secs: default_ttl_secs(),
            autostart: default_autostart(),
        }
    }
}
