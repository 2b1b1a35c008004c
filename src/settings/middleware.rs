use serde::Deserialize;
use std::time::Duration;
use crate::middleware::basic_auth::BasicAuthConfig;
use crate::middleware::cors::CorsConfig;
use crate::middleware::rate_limit::RateLimitConfig;
use super::{server::parse_env_var, SettingsError};

/// 내장 미들웨어 설정
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MiddlewareSettings {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub cors: CorsConfig,

    /// 0이면 Timeout 미들웨어를 설치하지 않습니다.
    #[serde(default)]
    pub request_timeout_secs: u64,

    /// 설정된 경우 `/admin` 그룹에 Basic 인증을 겁니다.
    #[serde(default)]
    pub basic_auth: Option<BasicAuthConfig>,
}

impl MiddlewareSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            max: parse_env_var("MARTIAN_RATE_LIMIT_MAX", || defaults.max)?,
            window_secs: parse_env_var("MARTIAN_RATE_LIMIT_WINDOW_SECS", || defaults.window_secs)?,
            cleanup_interval_secs: parse_env_var("MARTIAN_RATE_LIMIT_CLEANUP_SECS", || defaults.cleanup_interval_secs)?,
        };

        let mut cors = CorsConfig::default();
        if let Ok(origin) = std::env::var("MARTIAN_CORS_ORIGIN") {
            cors.origin = origin;
        }
        if let Ok(methods) = std::env::var("MARTIAN_CORS_METHODS") {
            cors.allow_methods = split_list(&methods);
        }
        if let Ok(headers) = std::env::var("MARTIAN_CORS_HEADERS") {
            cors.allow_headers = split_list(&headers);
        }

        Ok(Self {
            rate_limit,
            cors,
            request_timeout_secs: parse_env_var("MARTIAN_REQUEST_TIMEOUT_SECS", || 0)?,
            basic_auth: None,
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.rate_limit
            .validate()
            .map_err(|reason| SettingsError::invalid_value("middleware.rate_limit", reason))?;
        if let Some(auth) = &self.basic_auth {
            if auth.users.is_empty() {
                return Err(SettingsError::invalid_value(
                    "middleware.basic_auth.users",
                    "사용자 목록이 비어 있습니다",
                ));
            }
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
