mod common;

use std::sync::Arc;
use serde_json::Value;
use martian_stack::cache::{CacheExt, CacheService, MemoryCache};
use martian_stack::context::Ctx;
use martian_stack::error::Result;
use martian_stack::middleware::{start_session, SessionMiddleware};
use martian_stack::scope::Scope;
use martian_stack::session::{FlashLevel, SessionConfig};
use common::{client, cookie_pair, new_server, TestServer};

const COOKIE: &str = "martian_session_id";

async fn counter(ctx: Ctx) -> Result<()> {
    let session = ctx.session()?;
    let count = session.data().get_int("count").unwrap_or(0) + 1;
    session.data().set("count", &count)?;
    ctx.send_json(&serde_json::json!({ "count": count }))
}

async fn read_only(ctx: Ctx) -> Result<()> {
    let count = ctx.session()?.data().get_int("count").unwrap_or(0);
    ctx.send_string(&count.to_string())
}

fn session_server(cache: Arc<MemoryCache>, config: SessionConfig) -> martian_stack::server::Server {
    let mut server = new_server();
    server.add_middleware(SessionMiddleware::new(cache, config));
    server.get("/counter", counter).unwrap();
    server.get("/peek", read_only).unwrap();
    server
}

async fn count_of(res: reqwest::Response) -> i64 {
    let body: Value = res.json().await.unwrap();
    body["count"].as_i64().unwrap()
}

#[tokio::test]
async fn test_counter_follows_session_cookie() {
    let cache = Arc::new(MemoryCache::new());
    let srv = TestServer::spawn(session_server(cache.clone(), SessionConfig::default())).await;

    let res = client().get(srv.url("/counter")).send().await.unwrap();
    let cookie = cookie_pair(&res, COOKIE).expect("session cookie");
    let set_cookie = res.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Max-Age=172800"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Domain=127.0.0.1"));
    assert!(!set_cookie.contains("Secure"));
    assert_eq!(count_of(res).await, 1);

    for expected in 2..=3 {
        let res = client()
            .get(srv.url("/counter"))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap();
        assert!(cookie_pair(&res, COOKIE).is_none());
        assert_eq!(count_of(res).await, expected);
    }

    // 쿠키 없는 요청은 새 세션
    let res = client().get(srv.url("/counter")).send().await.unwrap();
    assert_ne!(cookie_pair(&res, COOKIE).unwrap(), cookie);
    assert_eq!(count_of(res).await, 1);

    let id = cookie.trim_start_matches(&format!("{}=", COOKIE));
    let stored: Value = serde_json::from_slice(
        &cache.get_bytes(&Scope::new(), &format!("sess:{}", id)).await.unwrap(),
    )
    .unwrap();
    assert_eq!(stored["count"], 3);
    srv.stop().await;
}

#[tokio::test]
async fn test_clean_session_is_not_persisted() {
    let cache = Arc::new(MemoryCache::new());
    let srv = TestServer::spawn(session_server(cache.clone(), SessionConfig::default())).await;

    let res = client().get(srv.url("/peek")).send().await.unwrap();
    let cookie = cookie_pair(&res, COOKIE).unwrap();
    assert_eq!(res.text().await.unwrap(), "0");

    let keys = cache.keys(&Scope::new(), "sess:*").await.unwrap();
    assert!(keys.is_empty(), "unexpected keys: {:?}", keys);
    assert!(!cookie.is_empty());
    srv.stop().await;
}

#[tokio::test]
async fn test_invalid_session_id_is_replaced() {
    let cache = Arc::new(MemoryCache::new());
    let srv = TestServer::spawn(session_server(cache, SessionConfig::default())).await;

    let res = client()
        .get(srv.url("/counter"))
        .header("cookie", format!("{}=../../etc", COOKIE))
        .send()
        .await
        .unwrap();
    let cookie = cookie_pair(&res, COOKIE).unwrap();
    assert_ne!(cookie, format!("{}=../../etc", COOKIE));
    assert_eq!(count_of(res).await, 1);
    srv.stop().await;
}

#[tokio::test]
async fn test_secure_cookie_behind_https_proxy() {
    let cache = Arc::new(MemoryCache::new());
    let srv = TestServer::spawn(session_server(cache, SessionConfig::default())).await;

    let res = client()
        .get(srv.url("/counter"))
        .header("x-forwarded-proto", "https")
        .send()
        .await
        .unwrap();
    let set_cookie = res.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(set_cookie.ends_with("; Secure"));
    srv.stop().await;
}

#[tokio::test]
async fn test_manual_session_start() {
    let cache = Arc::new(MemoryCache::new());
    let config = SessionConfig {
        autostart: false,
        ..SessionConfig::default()
    };

    let mut server = new_server();
    server.add_middleware(SessionMiddleware::new(cache.clone(), config.clone()));
    server.get("/counter", counter).unwrap();
    let login_cache = cache.clone();
    let login_config = config.clone();
    server
        .post("/login", move |ctx: Ctx| {
            let cache = login_cache.clone();
            let config = login_config.clone();
            async move {
                let session = start_session(&ctx, cache.as_ref(), &config).await?;
                session.add_flash(FlashLevel::Success, "welcome");
                ctx.send_string("logged in")
            }
        })
        .unwrap();
    server
        .get("/flash", |ctx: Ctx| async move {
            let flashes = ctx.session()?.take_flashes();
            ctx.send_json(&flashes)
        })
        .unwrap();
    let srv = TestServer::spawn(server).await;

    let res = client()
        .get(srv.url("/counter"))
        .header("accept", "application/json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["msg"], "Session not started");

    let res = client().post(srv.url("/login")).send().await.unwrap();
    let cookie = cookie_pair(&res, COOKIE).unwrap();

    // 자동 시작이 꺼져 있으면 쿠키가 있어도 세션을 불러오지 않음
    let res = client()
        .get(srv.url("/flash"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);

    let id = cookie.trim_start_matches(&format!("{}=", COOKIE));
    let stored: Value = cache.get(&Scope::new(), &format!("sess:{}", id)).await.unwrap();
    assert_eq!(stored["flashes"][0]["level"], "success");
    assert_eq!(stored["flashes"][0]["msg"], "welcome");
    srv.stop().await;
}
