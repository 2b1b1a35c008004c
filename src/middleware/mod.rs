//! 핸들러 체인과 기본 제공 미들웨어
//!
//! 미들웨어는 라우트 핸들러와 같은 [`Handler`] 트레이트를 구현하며,
//! 서버 전역 미들웨어, 그룹 미들웨어, 라우트 핸들러 순서로 하나의 체인을 이룹니다.

pub mod basic_auth;
mod chain;
pub mod cors;
pub mod headers;
mod log;
pub mod rate_limit;
mod recovery;
mod session;
mod timeout;
mod traits;

pub use basic_auth::BasicAuth;
pub use chain::{Chain, HandlerChain};
pub use cors::Cors;
pub use headers::SecurityHeaders;
pub use log::Log;
pub use rate_limit::RateLimit;
pub use recovery::{panic_message, Recovery};
pub use session::{start_session, SessionMiddleware};
pub use timeout::Timeout;
pub use traits::Handler;
