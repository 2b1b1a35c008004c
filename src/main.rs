use std::sync::Arc;
use serde_json::json;
use tracing::{error, info};
use martian_stack::cache::{CacheService, MemoryCache, RedisCache};
use martian_stack::context::Ctx;
use martian_stack::error::Result;
use martian_stack::logging::init_logging;
use martian_stack::middleware::{
    BasicAuth, Cors, HandlerChain, Log, RateLimit, Recovery, SecurityHeaders, SessionMiddleware, Timeout,
};
use martian_stack::server::Server;
use martian_stack::session::FlashLevel;
use martian_stack::settings::{CacheBackend, Settings};
use martian_stack::tls;

async fn home(ctx: Ctx) -> Result<()> {
    ctx.send_string("Welcome to the Home Page")
}

async fn hello(ctx: Ctx) -> Result<()> {
    let name = ctx.param("name").unwrap_or_default();
    ctx.send_string(&format!("Hello {}", name))
}

/// 세션별 방문 횟수
async fn counter(ctx: Ctx) -> Result<()> {
    let session = ctx.session()?;
    let count = session.data().get_int("count").unwrap_or(0) + 1;
    session.data().set("count", &count)?;
    ctx.send_json(&json!({ "count": count }))
}

async fn echo(ctx: Ctx) -> Result<()> {
    let value: serde_json::Value = ctx.unmarshal_body().await?;
    ctx.send_json(&value)
}

async fn add_flash(ctx: Ctx) -> Result<()> {
    let level = FlashLevel::parse_lenient(&ctx.param("level").unwrap_or_default());
    let msg = ctx.param("msg").unwrap_or_default();
    ctx.session()?.add_flash(level, &msg);
    ctx.with_status(204);
    Ok(())
}

async fn take_flashes(ctx: Ctx) -> Result<()> {
    let flashes = ctx.session()?.take_flashes();
    ctx.send_json(&flashes)
}

async fn admin_stats(ctx: Ctx) -> Result<()> {
    ctx.send_json(&json!({ "request_id": ctx.id() }))
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load().await?;
    let _guard = init_logging(&settings.logging);
    info!(addr = %settings.server.addr(), backend = ?settings.cache.backend, "Martian Stack 시작");

    let cache: Arc<dyn CacheService> = match settings.cache.backend {
        CacheBackend::Memory => Arc::new(MemoryCache::with_sweep_interval(settings.cache.sweep_interval())),
        CacheBackend::Redis => Arc::new(RedisCache::connect(&settings.cache.redis).await?),
    };

    let mut server = Server::new(settings.server.clone());
    server
        .add_middleware(Recovery::new())
        .add_middleware(Log::default())
        .add_middleware(SecurityHeaders::new())
        .add_middleware(Cors::new(&settings.middleware.cors)?)
        .add_middleware(RateLimit::from_config(&settings.middleware.rate_limit));
    if let Some(timeout) = settings.middleware.request_timeout() {
        server.add_middleware(Timeout::new(timeout));
    }
    server.add_middleware(SessionMiddleware::new(cache.clone(), settings.session.clone()));

    server
        .get("/", home)?
        .get("/hello/:name", hello)?
        .get("/counter", counter)?
        .post("/echo", echo)?
        .post("/flash", add_flash)?
        .get("/flash", take_flashes)?;

    if let Some(auth) = &settings.middleware.basic_auth {
        let mut admin_mw = HandlerChain::new();
        admin_mw.add(BasicAuth::from_config(auth));
        server.group("/admin", admin_mw).get("/stats", admin_stats)?;
    }

    let close_cache = async move {
        if let Err(e) = cache.close().await {
            error!(error = %e, "캐시 종료 실패");
        }
    };

    if settings.tls.enabled {
        let (Some(cert), Some(key)) = (&settings.tls.cert_path, &settings.tls.key_path) else {
            return Err("TLS 인증서와 키 경로가 필요합니다".into());
        };
        let acceptor = tls::load_acceptor(cert, key)?;
        server.listen_and_shutdown_tls(acceptor, close_cache).await?;
    } else {
        server.listen_and_shutdown(close_cache).await?;
    }

    info!("Martian Stack 종료");
    Ok(())
}
