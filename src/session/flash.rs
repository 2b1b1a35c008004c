use serde::{Deserialize, Serialize};
use tracing::warn;
use super::Session;

const FLASHES_KEY: &str = "flashes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    #[default]
    Info,
    Success,
    Warn,
    Error,
}

impl FlashLevel {
    /// 빈 문자열이나 알 수 없는 값은 `Info`입니다.
    pub fn parse_lenient(level: &str) -> Self {
        match level.to_lowercase().as_str() {
            "success" => FlashLevel::Success,
            "warn" => FlashLevel::Warn,
            "error" => FlashLevel::Error,
            _ => FlashLevel::Info,
        }
    }
}

/// 다음 요청에서 한 번 보여줄 알림 메시지
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub msg: String,
}

impl Session {
    fn load_flashes(&self) -> Vec<Flash> {
        self.data().get::<Vec<Flash>>(FLASHES_KEY).unwrap_or_default()
    }

    fn save_flashes(&self, flashes: &[Flash]) {
        if flashes.is_empty() {
            self.data().delete(FLASHES_KEY);
            return;
        }
        if let Err(e) = self.data().set(FLASHES_KEY, flashes) {
            warn!(session_id = %self.id(), error = %e, "플래시 메시지 저장 실패");
        }
    }

    /// 빈 메시지는 무시합니다.
    pub fn add_flash(&self, level: FlashLevel, msg: &str) {
        if msg.is_empty() {
            return;
        }
        let mut flashes = self.load_flashes();
        flashes.push(Flash { level, msg: msg.to_string() });
        self.save_flashes(&flashes);
    }

    /// 쌓인 메시지를 모두 반환하고 비웁니다.
    pub fn take_flashes(&self) -> Vec<Flash> {
        let flashes = self.load_flashes();
        self.data().delete(FLASHES_KEY);
        flashes
    }

    pub fn has_flashes(&self) -> bool {
        !self.load_flashes().is_empty()
    }

    pub fn next_flash(&self) -> Option<Flash> {
        let mut flashes = self.load_flashes();
        if flashes.is_empty() {
            return None;
        }
        let first = flashes.remove(0);
        self.save_flashes(&flashes);
        Some(first)
    }
}
