//! Martian Stack은 핸들러 체인 기반의 경량 HTTP 서비스 프레임워크입니다.
//!
//! # 주요 기능
//!
//! - 메서드/경로 패턴 라우팅 (`:name`, `{name}` 파라미터, 라우트 그룹)
//! - 요청 컨텍스트와 `next()` 연속 호출로 이어지는 미들웨어 체인
//! - 패닉 복구, rate limit, CORS, 보안 헤더, 제한 시간, 세션, 요청 로그 미들웨어
//! - 메모리/Redis 캐시와 그 위의 세션
//!
//! # 예제
//!
//! ```no_run
//! use martian_stack::context::Ctx;
//! use martian_stack::middleware::{Log, Recovery};
//! use martian_stack::server::Server;
//! use martian_stack::settings::ServerSettings;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = Server::new(ServerSettings::default());
//! server.add_middleware(Recovery::new()).add_middleware(Log::default());
//!
//! server.get("/hello/:name", |ctx: Ctx| async move {
//!     let name = ctx.param("name").unwrap_or_default();
//!     ctx.send_string(&format!("Hello {}", name))
//! })?;
//!
//! server.listen_and_shutdown(async {}).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod context;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routing;
pub mod scope;
pub mod server;
pub mod session;
pub mod settings;
pub mod store;
pub mod tls;

pub use context::Ctx;
pub use error::{Error, HttpError, Result};
