use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use super::config::BasicAuthConfig;

/// Basic 인증을 위한 인증기 트레이트
pub trait Authenticator: Send + Sync {
    /// 사용자 자격증명을 검증합니다.
    fn verify_credentials(&self, username: &str, password: &str) -> bool;
}

enum Secret {
    /// 평문 비밀번호의 SHA-256 다이제스트
    Plain([u8; 32]),
    /// bcrypt 해시
    Bcrypt(String),
}

struct Credential {
    user: [u8; 32],
    secret: Secret,
}

/// 설정된 사용자 목록으로 검증하는 인증기
///
/// 사용자 이름과 평문 비밀번호는 SHA-256 다이제스트끼리 상수 시간으로 비교하므로
/// 길이 차이가 응답 시간에 드러나지 않습니다.
pub struct CredentialAuthenticator {
    credentials: Vec<Credential>,
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

impl CredentialAuthenticator {
    pub fn new<'a, I>(users: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let credentials = users
            .into_iter()
            .map(|(user, secret)| Credential {
                user: digest(user),
                secret: if secret.starts_with("$2") {
                    Secret::Bcrypt(secret.to_string())
                } else {
                    Secret::Plain(digest(secret))
                },
            })
            .collect();
        Self { credentials }
    }

    pub fn from_config(config: &BasicAuthConfig) -> Self {
        Self::new(config.users.iter().map(|(u, p)| (u.as_str(), p.as_str())))
    }
}

impl Authenticator for CredentialAuthenticator {
    fn verify_credentials(&self, username: &str, password: &str) -> bool {
        let given_user = digest(username);
        let given_pass = digest(password);

        // 일치 여부와 무관하게 모든 항목을 비교
        let mut matched = false;
        for credential in &self.credentials {
            let user_match: bool = credential.user[..].ct_eq(&given_user[..]).into();
            let pass_match: bool = match &credential.secret {
                Secret::Plain(expected) => expected[..].ct_eq(&given_pass[..]).into(),
                Secret::Bcrypt(hash) => user_match && bcrypt::verify(password, hash).unwrap_or(false),
            };
            matched |= user_match && pass_match;
        }
        matched
    }
}
