use serde::Deserialize;
use std::env;
use std::time::Duration;
use super::SettingsError;

#[derive(Clone, Debug, Deserialize)]
pub struct ServerSettings {
    /// 바인드 주소 (기본값: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP 포트 (기본값: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// 요청 헤더 읽기 제한 시간(초)
    ///
    /// 연결이 열린 뒤(keep-alive 연결은 이전 응답 뒤) 요청 헤더를 모두 받을 때까지만
    /// 적용됩니다. 본문 읽기와 응답 쓰기에는 제한이 없으며, 핸들러 실행 시간은
    /// `middleware.request_timeout_secs`(Timeout 미들웨어)로 제한합니다.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// 종료 시 진행 중인 요청을 기다리는 최대 시간(초)
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_timeout_secs() -> u64 { 15 }
fn default_shutdown_grace_secs() -> u64 { 30 }

pub fn parse_env_var<T: std::str::FromStr, F: FnOnce() -> T>(name: &str, default: F) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| SettingsError::InvalidEnv {
            var_name: name.to_string(),
            value: val,
            reason: e.to_string(),
        }),
        Err(env::VarError::NotPresent) => Ok(default()),
        Err(e) => Err(SettingsError::InvalidEnv {
            var_name: name.to_string(),
            value: "".to_string(),
            reason: e.to_string(),
        }),
    }
}

impl ServerSettings {
    const MIN_PORT: u16 = 1;
    const MAX_PORT: u16 = 65535;

    fn parse_port(name: &str, value: &str) -> Result<u16, SettingsError> {
        let port = value.parse::<u16>().map_err(|_| SettingsError::InvalidEnv {
            var_name: name.to_string(),
            value: value.to_string(),
            reason: format!("포트는 {}-{} 범위여야 합니다", Self::MIN_PORT, Self::MAX_PORT),
        })?;

        if port < Self::MIN_PORT {
            return Err(SettingsError::InvalidEnv {
                var_name: name.to_string(),
                value: value.to_string(),
                reason: "포트는 0이 될 수 없습니다".to_string(),
            });
        }

        Ok(port)
    }

    pub fn from_env() -> Result<Self, SettingsError> {
        let port = Self::parse_port(
            "MARTIAN_PORT",
            &env::var("MARTIAN_PORT").unwrap_or_else(|_| default_port().to_string())
        )?;

        let settings = Self {
            host: env::var("MARTIAN_HOST").unwrap_or_else(|_| default_host()),
            port,
            timeout_secs: parse_env_var("MARTIAN_TIMEOUT_SECS", default_timeout_secs)?,
            shutdown_grace_secs: parse_env_var("MARTIAN_SHUTDOWN_GRACE_SECS", default_shutdown_grace_secs)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.host.trim().is_empty() {
            return Err(SettingsError::invalid_value("server.host", "호스트가 비어 있습니다"));
        }
        if self.timeout_secs == 0 {
            return Err(SettingsError::invalid_value("server.timeout_secs", "제한 시간은 0보다 커야 합니다"));
        }
        Ok(())
    }

    /// `host:port` 형식의 바인드 주소
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// hyper `header_read_timeout`에 넘기는 값
    pub fn header_read_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}
