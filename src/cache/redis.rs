use std::time::Duration;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Cmd, FromRedisValue};
use tracing::{debug, info, warn};
use url::Url;
use crate::scope::Scope;
use crate::settings::RedisSettings;
use super::{check_scope, CacheError, CacheService};

/// Redis 캐시 백엔드
///
/// 명령 전송은 `redis` 크레이트의 `ConnectionManager`에 맡기며, 끊어진 연결은
/// 자동으로 재연결됩니다. 각 명령은 호출자 범위와 경쟁하며, 범위가 먼저 끝나면
/// 응답을 기다리지 않고 실패합니다.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(settings: &RedisSettings) -> Result<Self, CacheError> {
        let url = connection_url(settings)?;
        let client = redis::Client::open(url.as_str())?;
        let conn = ConnectionManager::new(client).await?;

        info!(
            host = %settings.host,
            port = settings.port,
            db = settings.db,
            "Redis 캐시 연결 완료"
        );
        Ok(Self { conn })
    }

    async fn run<T: FromRedisValue + Send>(&self, scope: &Scope, cmd: Cmd) -> Result<T, CacheError> {
        check_scope(scope)?;
        let mut conn = self.conn.clone();

        tokio::select! {
            result = cmd.query_async::<_, T>(&mut conn) => result.map_err(CacheError::from),
            reason = scope.done() => Err(reason.into()),
        }
    }
}

/// `redis://[user][:password@]host:port/db` 형식의 연결 주소를 만듭니다.
pub fn connection_url(settings: &RedisSettings) -> Result<Url, CacheError> {
    let invalid = |reason: String| CacheError::Backend(format!("invalid redis address: {}", reason));

    let mut url = Url::parse(&format!("redis://{}:{}", settings.host, settings.port))
        .map_err(|e| invalid(e.to_string()))?;
    url.set_path(&format!("/{}", settings.db));

    if let Some(username) = settings.username.as_deref().filter(|u| !u.is_empty()) {
        url.set_username(username).map_err(|_| invalid("username".to_string()))?;
    }
    if let Some(password) = settings.password.as_deref().filter(|p| !p.is_empty()) {
        url.set_password(Some(password)).map_err(|_| invalid("password".to_string()))?;
    }
    Ok(url)
}

/// 글롭 패턴을 Redis `KEYS` 패턴으로 바꿉니다.
///
/// 메모리 백엔드와 맞추기 위해 `*` 이외의 Redis 글롭 문자는 이스케이프하고,
/// 키 시작에만 고정되도록 끝에 `*`를 붙입니다.
pub fn redis_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 1);
    for ch in pattern.chars() {
        if matches!(ch, '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    if !out.ends_with('*') {
        out.push('*');
    }
    out
}

#[async_trait]
impl CacheService for RedisCache {
    async fn set_bytes(&self, scope: &Scope, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if !ttl.is_zero() {
            let millis = ttl.as_millis().max(1) as u64;
            cmd.arg("PX").arg(millis);
        }
        self.run::<()>(scope, cmd).await
    }

    async fn get_bytes(&self, scope: &Scope, key: &str) -> Result<Vec<u8>, CacheError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run::<Option<Vec<u8>>>(scope, cmd)
            .await?
            .ok_or_else(|| CacheError::not_found(key))
    }

    async fn exists(&self, scope: &Scope, key: &str) -> bool {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        match self.run::<bool>(scope, cmd).await {
            Ok(found) => found,
            Err(e) => {
                warn!(key = %key, error = %e, "Redis EXISTS 실패");
                false
            }
        }
    }

    async fn keys(&self, scope: &Scope, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut cmd = redis::cmd("KEYS");
        cmd.arg(redis_pattern(pattern));
        self.run::<Vec<String>>(scope, cmd).await
    }

    async fn delete(&self, scope: &Scope, keys: &[&str]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return check_scope(scope);
        }
        let mut cmd = redis::cmd("DEL");
        cmd.arg(keys);
        let removed = self.run::<i64>(scope, cmd).await?;
        debug!(removed, "Redis 키 삭제");
        Ok(())
    }

    async fn delete_pattern(&self, scope: &Scope, pattern: &str) -> Result<(), CacheError> {
        let keys = self.keys(scope, pattern).await?;
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.delete(scope, &refs).await
    }

    async fn flush(&self, scope: &Scope) -> Result<(), CacheError> {
        self.run::<()>(scope, redis::cmd("FLUSHDB")).await
    }

    async fn close(&self) -> Result<(), CacheError> {
        debug!("Redis 캐시 종료");
        Ok(())
    }
}
