use std::collections::HashMap;
use serde::Deserialize;

/// Basic 인증 설정
///
/// `users` 값은 평문 비밀번호 또는 bcrypt 해시(`$2a$`, `$2b$`, `$2y$`)입니다.
///
/// ```toml
/// [middleware.basic_auth]
/// realm = "Restricted"
///
/// [middleware.basic_auth.users]
/// admin = "$2y$05$c4WoMPo3SXsafkva.HHa6uXQZWr7oboPiC2bT/r7q1BB8I2s0BRqC"
/// ops = "plain-secret"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BasicAuthConfig {
    /// 사용자 이름과 비밀번호(또는 해시) 맵
    #[serde(default)]
    pub users: HashMap<String, String>,

    /// 인증 영역 (realm)
    #[serde(default = "default_realm")]
    pub realm: String,
}

fn default_realm() -> String {
    "Restricted".to_string()
}

impl Default for BasicAuthConfig {
    fn default() -> Self {
        Self {
            users: HashMap::new(),
            realm: default_realm(),
        }
    }
}
