use std::{env, path::Path};
use serde::Deserialize;
use tracing::{debug, info};
use crate::session::SessionConfig;

mod server;
pub mod logging;
mod tls;
mod cache;
mod middleware;
mod error;

pub use server::ServerSettings;
pub use logging::{LogFormat, LogOutput, LogSettings};
pub use tls::TlsSettings;
pub use cache::{CacheBackend, CacheSettings, RedisSettings};
pub use middleware::MiddlewareSettings;
pub use error::SettingsError;

pub type Result<T> = std::result::Result<T, SettingsError>;
pub use server::parse_env_var;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    // 서버 설정
    #[serde(default)]
    pub server: ServerSettings,

    // 로깅 설정
    #[serde(default)]
    pub logging: LogSettings,

    // TLS 설정
    #[serde(default)]
    pub tls: TlsSettings,

    /// 캐시 백엔드 설정
    #[serde(default)]
    pub cache: CacheSettings,

    /// 세션 쿠키/TTL 설정
    #[serde(default)]
    pub session: SessionConfig,

    /// 내장 미들웨어 설정
    #[serde(default)]
    pub middleware: MiddlewareSettings,
}

impl Settings {
    /// `MARTIAN_CONFIG_FILE`이 있으면 TOML 파일을, 없으면 환경 변수를 읽습니다.
    pub async fn load() -> Result<Self> {
        if let Ok(config_path) = env::var("MARTIAN_CONFIG_FILE") {
            Self::from_toml_file(&config_path).await
        } else {
            Self::from_env().await
        }
    }

    pub async fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("설정 파일 로드: {}", path.display());

        let content = tokio::fs::read_to_string(path).await.map_err(|e| SettingsError::Unreadable {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let settings = Self::from_toml_str(&content)?;
        settings.validate().await?;

        info!("설정 파일 로드 완료: {}", path.display());
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SettingsError::Toml { source: e })
    }

    pub async fn from_env() -> Result<Self> {
        let settings = Self {
            server: ServerSettings::from_env()?,
            logging: LogSettings::from_env()?,
            tls: TlsSettings::from_env()?,
            cache: CacheSettings::from_env()?,
            session: SessionConfig::from_env()?,
            middleware: MiddlewareSettings::from_env()?,
        };

        // 설정 생성 시점에 바로 검증
        settings.validate().await?;
        Ok(settings)
    }

    /// 설정 유효성 검증
    pub async fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.tls.validate().await?;
        self.cache.validate()?;
        self.session.validate()?;
        self.middleware.validate()?;
        Ok(())
    }
}
