use std::env;
use std::time::Duration;
use serde::Deserialize;
use super::{server::parse_env_var, SettingsError};

/// 캐시 백엔드 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

impl std::str::FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            _ => Err(format!("Invalid cache backend: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub backend: CacheBackend,

    /// 메모리 백엔드의 만료 정리 주기(ms)
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    #[serde(default)]
    pub redis: RedisSettings,
}

fn default_sweep_interval_ms() -> u64 { 200 }

impl CacheSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self {
            backend: parse_env_var("MARTIAN_CACHE_BACKEND", CacheBackend::default)?,
            sweep_interval_ms: parse_env_var("MARTIAN_CACHE_SWEEP_MS", default_sweep_interval_ms)?,
            redis: RedisSettings::from_env()?,
        })
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.backend == CacheBackend::Memory && self.sweep_interval_ms == 0 {
            return Err(SettingsError::invalid_value(
                "cache.sweep_interval_ms",
                "메모리 캐시 정리 주기는 0보다 커야 합니다",
            ));
        }
        if self.backend == CacheBackend::Redis && self.redis.host.trim().is_empty() {
            return Err(SettingsError::invalid_value("cache.redis.host", "Redis 호스트가 비어 있습니다"));
        }
        Ok(())
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            sweep_interval_ms: default_sweep_interval_ms(),
            redis: RedisSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_host")]
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub db: i64,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn default_redis_host() -> String { "localhost".to_string() }
fn default_redis_port() -> u16 { 6379 }

impl RedisSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self {
            host: env::var("MARTIAN_REDIS_HOST").unwrap_or_else(|_| default_redis_host()),
            port: parse_env_var("MARTIAN_REDIS_PORT", default_redis_port)?,
            db: parse_env_var("MARTIAN_REDIS_DB", || 0)?,
            username: env::var("MARTIAN_REDIS_USER").ok(),
            password: env::var("MARTIAN_REDIS_PASSWORD").ok(),
        })
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            db: 0,
            username: None,
            password: None,
        }
    }
}
