use std::fmt;

/// 설정 로드/검증 에러
///
/// 환경 변수에서 온 값은 변수 이름을, TOML에서 온 값은 `server.port` 같은
/// 설정 경로를 함께 보고합니다.
#[derive(Debug)]
pub enum SettingsError {
    /// `MARTIAN_*` 환경 변수 값을 해석할 수 없음
    InvalidEnv {
        var_name: String,
        value: String,
        reason: String,
    },
    /// 해석은 됐지만 허용되지 않는 설정 값
    InvalidValue {
        field: &'static str,
        reason: String,
    },
    /// TLS가 켜져 있는데 인증서 또는 키 경로가 없음
    TlsPathMissing {
        field: &'static str,
    },
    /// 설정 파일이나 인증서 파일을 읽을 수 없음
    Unreadable {
        path: String,
        source: std::io::Error,
    },
    /// TOML 문법 또는 타입 오류
    Toml {
        source: toml::de::Error,
    },
}

impl SettingsError {
    pub(crate) fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        SettingsError::InvalidValue { field, reason: reason.into() }
    }

    /// 문제가 된 환경 변수 이름이나 설정 경로
    pub fn field(&self) -> Option<&str> {
        match self {
            SettingsError::InvalidEnv { var_name, .. } => Some(var_name),
            SettingsError::InvalidValue { field, .. } | SettingsError::TlsPathMissing { field } => Some(field),
            SettingsError::Unreadable { .. } | SettingsError::Toml { .. } => None,
        }
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnv { var_name, value, reason } =>
                write!(f, "환경 변수 {}={:?} 해석 실패: {}", var_name, value, reason),
            Self::InvalidValue { field, reason } =>
                write!(f, "설정 {} 값이 잘못되었습니다: {}", field, reason),
            Self::TlsPathMissing { field } =>
                write!(f, "TLS가 활성화되었지만 {}가 설정되지 않았습니다", field),
            Self::Unreadable { path, source } =>
                write!(f, "파일 {} 읽기 실패: {}", path, source),
            Self::Toml { source } =>
                write!(f, "TOML 설정 해석 실패: {}", source),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Toml { source } => Some(source),
            Self::Unreadable { source, .. } => Some(source),
            _ => None,
        }
    }
}
