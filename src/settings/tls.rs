use std::{env, path::PathBuf};
use serde::Deserialize;
use tokio::fs;
use super::{server::parse_env_var, SettingsError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsSettings {
    /// HTTPS 활성화 여부
    #[serde(default)]
    pub enabled: bool,

    /// 인증서 파일 경로 (PEM)
    pub cert_path: Option<PathBuf>,

    /// 개인키 파일 경로 (PEM)
    pub key_path: Option<PathBuf>,
}

impl TlsSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self {
            enabled: parse_env_var("MARTIAN_TLS_ENABLED", || false)?,
            cert_path: env::var("MARTIAN_TLS_CERT").map(PathBuf::from).ok(),
            key_path: env::var("MARTIAN_TLS_KEY").map(PathBuf::from).ok(),
        })
    }

    /// 활성화된 경우 인증서와 키 파일을 모두 읽을 수 있어야 합니다.
    pub async fn validate(&self) -> Result<(), SettingsError> {
        if !self.enabled {
            return Ok(());
        }

        let cert_path = self.cert_path.as_ref().ok_or_else(|| SettingsError::TlsPathMissing {
            field: "tls.cert_path",
        })?;

        let key_path = self.key_path.as_ref().ok_or_else(|| SettingsError::TlsPathMissing {
            field: "tls.key_path",
        })?;

        for path in [cert_path, key_path] {
            fs::read(path).await.map_err(|e| SettingsError::Unreadable {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
        }

        Ok(())
    }
}
