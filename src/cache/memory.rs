use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use crate::scope::Scope;
use super::{check_scope, glob_to_regex, CacheError, CacheService};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Vec<u8>, ttl: Duration, now: Instant) -> Self {
        let expires_at = if ttl.is_zero() { None } else { Some(now + ttl) };
        Self { value, expires_at }
    }

    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now > at)
    }
}

type EntryMap = RwLock<HashMap<String, Entry>>;

/// 프로세스 내부 캐시 백엔드
///
/// 인스턴스마다 하나의 만료 정리 작업이 주기적으로 돌지만,
/// 모든 읽기 경로가 만료 시각을 직접 다시 확인하므로 정리 주기와 무관하게
/// TTL이 지난 값은 반환되지 않습니다.
///
/// 정리 작업은 `close()` 또는 drop 시점에 중단됩니다.
pub struct MemoryCache {
    entries: Arc<EntryMap>,
    sweeper: CancellationToken,
}

impl MemoryCache {
    pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(200);

    pub fn new() -> Self {
        Self::with_sweep_interval(Self::DEFAULT_SWEEP_INTERVAL)
    }

    /// 지정한 주기로 만료 항목을 정리하는 캐시를 만듭니다.
    ///
    /// tokio 런타임 밖에서 생성하면 정리 작업 없이 동작하며,
    /// 이 경우에도 읽기 시점 만료 확인은 그대로 적용됩니다.
    pub fn with_sweep_interval(interval: Duration) -> Self {
        let entries: Arc<EntryMap> = Arc::new(RwLock::new(HashMap::new()));
        let sweeper = CancellationToken::new();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) if !interval.is_zero() => {
                handle.spawn(run_sweeper(Arc::downgrade(&entries), interval, sweeper.clone()));
            }
            Ok(_) => warn!("캐시 정리 주기가 0이므로 정리 작업을 시작하지 않습니다"),
            Err(_) => warn!("tokio 런타임이 없어 캐시 정리 작업을 시작하지 않습니다"),
        }

        Self { entries, sweeper }
    }

    /// 아직 정리되지 않은 만료 항목을 포함한 저장 항목 수
    pub fn stored_len(&self) -> usize {
        self.entries.read().len()
    }

    fn ensure_open(&self) -> Result<(), CacheError> {
        if self.sweeper.is_cancelled() {
            return Err(CacheError::Closed);
        }
        Ok(())
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryCache {
    fn drop(&mut self) {
        self.sweeper.cancel();
    }
}

async fn run_sweeper(entries: Weak<EntryMap>, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(interval_ms = interval.as_millis() as u64, "캐시 만료 정리 작업 시작");

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let Some(entries) = entries.upgrade() else { break };
                let removed = sweep_expired(&entries, Instant::now());
                if removed > 0 {
                    trace!(removed, "만료된 캐시 항목 정리");
                }
            }
        }
    }

    debug!("캐시 만료 정리 작업 종료");
}

fn sweep_expired(entries: &EntryMap, now: Instant) -> usize {
    let mut map = entries.write();
    let before = map.len();
    map.retain(|_, entry| !entry.is_expired(now));
    before - map.len()
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn set_bytes(&self, scope: &Scope, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        check_scope(scope)?;
        self.ensure_open()?;

        let entry = Entry::new(value, ttl, Instant::now());
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    async fn get_bytes(&self, scope: &Scope, key: &str) -> Result<Vec<u8>, CacheError> {
        check_scope(scope)?;
        self.ensure_open()?;

        let map = self.entries.read();
        match map.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => Ok(entry.value.clone()),
            _ => Err(CacheError::not_found(key)),
        }
    }

    async fn exists(&self, scope: &Scope, key: &str) -> bool {
        if scope.is_done() || self.sweeper.is_cancelled() {
            return false;
        }
        let map = self.entries.read();
        map.get(key)
            .map(|entry| !entry.is_expired(Instant::now()))
            .unwrap_or(false)
    }

    async fn keys(&self, scope: &Scope, pattern: &str) -> Result<Vec<String>, CacheError> {
        check_scope(scope)?;
        self.ensure_open()?;
        let re = glob_to_regex(pattern)?;
        let now = Instant::now();

        let map = self.entries.read();
        let mut keys = Vec::new();
        for (key, entry) in map.iter() {
            check_scope(scope)?;
            if !entry.is_expired(now) && re.is_match(key) {
                keys.push(key.clone());
            }
        }
        Ok(keys)
    }

    async fn delete(&self, scope: &Scope, keys: &[&str]) -> Result<(), CacheError> {
        check_scope(scope)?;
        self.ensure_open()?;

        let mut map = self.entries.write();
        for key in keys {
            check_scope(scope)?;
            map.remove(*key);
        }
        Ok(())
    }

    async fn delete_pattern(&self, scope: &Scope, pattern: &str) -> Result<(), CacheError> {
        check_scope(scope)?;
        self.ensure_open()?;
        let re = glob_to_regex(pattern)?;

        self.entries.write().retain(|key, _| !re.is_match(key));
        Ok(())
    }

    async fn flush(&self, scope: &Scope) -> Result<(), CacheError> {
        check_scope(scope)?;
        self.ensure_open()?;
        self.entries.write().clear();
        Ok(())
    }

    async fn close(&self) -> Result<(), CacheError> {
        self.sweeper.cancel();
        self.entries.write().clear();
        debug!("메모리 캐시 종료");
        Ok(())
    }
}
