//! Rate Limiting 미들웨어
//!
//! 클라이언트 IP별 고정 윈도우 카운터로 요청 수를 제한합니다.

mod config;
pub mod store;
mod middleware;

pub use config::RateLimitConfig;
pub use middleware::RateLimit;
pub use store::{FixedWindowStore, RateLimitDecision};
