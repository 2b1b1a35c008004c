mod common;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use martian_stack::context::Ctx;
use martian_stack::error::{Error, HttpError, Result};
use martian_stack::middleware::{HandlerChain, Timeout};
use martian_stack::routing::Method;
use martian_stack::server::Server;
use martian_stack::settings::ServerSettings;
use common::{client, new_server, TestServer};

async fn hello(ctx: Ctx) -> Result<()> {
    let name = ctx.param("name").unwrap_or_default();
    ctx.send_string(&format!("Hello {}", name))
}

#[tokio::test]
async fn test_path_params_in_both_syntaxes() {
    let mut server = new_server();
    server.get("/hello/:name", hello).unwrap();
    server.get("/greet/{name}", hello).unwrap();
    let srv = TestServer::spawn(server).await;

    for path in ["/hello/Ann", "/greet/Ann"] {
        let res = client().get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), 200, "path: {}", path);
        assert_eq!(res.text().await.unwrap(), "Hello Ann");
    }
    srv.stop().await;
}

#[tokio::test]
async fn test_builtin_routes() {
    let srv = TestServer::spawn(new_server()).await;

    let res = client().get(srv.url("/server/ready")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "OK");

    let res = client()
        .get(srv.url("/not-found"))
        .header("accept", "application/json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    let body: HttpError = res.json().await.unwrap();
    assert_eq!(body, HttpError::not_found());
    srv.stop().await;
}

#[tokio::test]
async fn test_root_route_does_not_shadow_missing_paths() {
    let mut server = new_server();
    server.get("/", |ctx: Ctx| async move { ctx.send_string("Welcome to the Home Page") }).unwrap();
    server.get("/hello", |ctx: Ctx| async move { ctx.send_string("Hello, World!") }).unwrap();
    let srv = TestServer::spawn(server).await;

    let res = client().get(srv.url("/")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "Welcome to the Home Page");

    let res = client().get(srv.url("/hello")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "Hello, World!");

    let res = client().get(srv.url("/missing")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    srv.stop().await;
}

#[tokio::test]
async fn test_error_content_negotiation() {
    let mut server = new_server();
    server
        .get("/error/500", |_ctx: Ctx| async move { Err::<(), Error>(HttpError::from_status(500).into()) })
        .unwrap();
    let srv = TestServer::spawn(server).await;

    let res = client()
        .get(srv.url("/error/500"))
        .header("accept", "application/json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(
        res.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "code": 500, "msg": "Internal Server Error" })
    );

    let res = client()
        .get(srv.url("/error/500"))
        .header("accept", "text/plain")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "Internal Server Error");

    let res = client()
        .get(srv.url("/error/500"))
        .header("accept", "text/html")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let html = res.text().await.unwrap();
    assert!(html.contains("<h1>500</h1>"));
    assert!(html.contains("Internal Server Error"));
    srv.stop().await;
}

#[tokio::test]
async fn test_custom_error_handler() {
    let mut server = new_server();
    server.error_handler(|ctx: &Ctx, err: &Error| {
        let e = err.to_http();
        let _ = ctx
            .with_status(e.code)
            .send_string(&format!("TestErrorHandler: {} {}", e.code, e.msg));
    });
    let srv = TestServer::spawn(server).await;

    let res = client().get(srv.url("/not-found")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "TestErrorHandler: 404 Resource not found");
    srv.stop().await;
}

#[tokio::test]
async fn test_chain_runs_in_registration_order() {
    let trace: Arc<Mutex<Vec<String>>> = Arc::default();
    let mut server = new_server();

    for name in ["first", "second"] {
        let trace = trace.clone();
        server.add_middleware(move |ctx: Ctx| {
            let trace = trace.clone();
            async move {
                trace.lock().push(format!("{} in", name));
                let result = ctx.next().await;
                trace.lock().push(format!("{} out", name));
                result
            }
        });
    }

    let handler_trace = trace.clone();
    server
        .get("/order", move |ctx: Ctx| {
            let trace = handler_trace.clone();
            async move {
                trace.lock().push("handler".to_string());
                ctx.send_string("done")
            }
        })
        .unwrap();
    let srv = TestServer::spawn(server).await;

    let res = client().get(srv.url("/order")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "done");
    assert_eq!(
        *trace.lock(),
        vec!["first in", "second in", "handler", "second out", "first out"]
    );
    srv.stop().await;
}

#[tokio::test]
async fn test_groups_prefix_and_middleware() {
    let mut server = new_server();
    {
        let mut api_mw = HandlerChain::new();
        api_mw.add(|ctx: Ctx| async move {
            ctx.with_header(
                hyper::header::HeaderName::from_static("x-api"),
                hyper::header::HeaderValue::from_static("v1"),
            );
            ctx.next().await
        });
        let mut api = server.group("/api/v1", api_mw);
        api.get("/users/:id", |ctx: Ctx| async move {
            let id = ctx.param("id").unwrap_or_default();
            ctx.send_string(&format!("user {}", id))
        })
        .unwrap();

        let mut admin_mw = HandlerChain::new();
        admin_mw.add(|ctx: Ctx| async move {
            if ctx.request_header("x-admin").is_none() {
                return Err(ctx.error(403, ""));
            }
            ctx.next().await
        });
        api.group("/admin", admin_mw)
            .get("/stats", |ctx: Ctx| async move { ctx.send_string("stats") })
            .unwrap();
    }
    let srv = TestServer::spawn(server).await;

    let res = client().get(srv.url("/api/v1/users/7")).send().await.unwrap();
    assert_eq!(res.headers()["x-api"], "v1");
    assert_eq!(res.text().await.unwrap(), "user 7");

    let res = client().get(srv.url("/api/v1/admin/stats")).send().await.unwrap();
    assert_eq!(res.status(), 403);

    let res = client()
        .get(srv.url("/api/v1/admin/stats"))
        .header("x-admin", "1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "stats");
    srv.stop().await;
}

#[tokio::test]
async fn test_methods_and_lenient_registration() {
    let mut server = new_server();
    server.post("/items", |ctx: Ctx| async move { ctx.with_status(201).send_string("created") }).unwrap();
    server.route("FETCH", "/lenient", |ctx: Ctx| async move { ctx.send_string("get") }).unwrap();
    server.route(Method::Any, "/anything", |ctx: Ctx| async move {
        let method = ctx.method().to_string();
        ctx.send_string(&method)
    })
    .unwrap();
    let srv = TestServer::spawn(server).await;

    let res = client().post(srv.url("/items")).send().await.unwrap();
    assert_eq!(res.status(), 201);

    // POST 라우트에 GET은 루트 catch-all로 떨어짐
    let res = client().get(srv.url("/items")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    let res = client().get(srv.url("/lenient")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "get");

    let res = client().head(srv.url("/lenient")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let res = client().delete(srv.url("/anything")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "DELETE");
    srv.stop().await;
}

#[tokio::test]
async fn test_json_body_round_trip() {
    #[derive(serde::Deserialize, serde::Serialize)]
    struct Item {
        name: String,
        qty: u32,
    }

    let mut server = new_server();
    server
        .post("/echo", |ctx: Ctx| async move {
            let item: Item = ctx.unmarshal_body().await?;
            ctx.send_json(&item)
        })
        .unwrap();
    let srv = TestServer::spawn(server).await;

    let res = client()
        .post(srv.url("/echo"))
        .json(&serde_json::json!({ "name": "bolt", "qty": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.json::<serde_json::Value>().await.unwrap(),
        serde_json::json!({ "name": "bolt", "qty": 3 })
    );

    let oversized = vec![b'a'; martian_stack::context::MAX_BODY_BYTES + 1];
    let res = client().post(srv.url("/echo")).body(oversized).send().await.unwrap();
    assert_eq!(res.status(), 413);
    srv.stop().await;
}

#[tokio::test]
async fn test_rejected_body_keeps_its_error_on_reread() {
    let mut server = new_server();
    server
        .post("/reread", |ctx: Ctx| async move {
            if ctx.body().await.is_ok() {
                return ctx.send_string("read");
            }
            ctx.body().await?;
            ctx.send_string("second read succeeded")
        })
        .unwrap();
    let srv = TestServer::spawn(server).await;

    let oversized = vec![b'a'; martian_stack::context::MAX_BODY_BYTES + 1];
    let res = client()
        .post(srv.url("/reread"))
        .header("accept", "text/plain")
        .body(oversized)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 413);
    assert_eq!(res.text().await.unwrap(), "Payload Too Large");

    let res = client().post(srv.url("/reread")).body("small").send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "read");
    srv.stop().await;
}

#[tokio::test]
async fn test_server_handle_lifecycle() {
    let mut settings = martian_stack::settings::ServerSettings::default();
    settings.port = 0;
    let handle = martian_stack::server::Server::new(settings).start().await.unwrap();

    assert!(handle.wait_until_ready().await);
    assert!(handle.is_ready().await);
    let url = handle.url();
    handle.shutdown().await.unwrap();

    assert!(client().get(format!("{}/server/ready", url)).send().await.is_err());
}

#[tokio::test]
async fn test_out_of_range_error_code_answers_500() {
    let mut server = new_server();
    server.get("/broken", |ctx: Ctx| async move { Err::<(), _>(ctx.error(1000, "broken")) }).unwrap();
    let srv = TestServer::spawn(server).await;

    let res = client()
        .get(srv.url("/broken"))
        .header("accept", "application/json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let body: HttpError = res.json().await.unwrap();
    assert_eq!(body, HttpError::new(500, "broken"));
    srv.stop().await;
}

const WAITING: u8 = 0;
const CANCELLED: u8 = 1;
const FINISHED: u8 = 2;

/// 요청 범위를 지켜보다가 취소되면 CANCELLED, 끝까지 기다리면 FINISHED를 기록하는 핸들러
fn watch_scope(state: Arc<AtomicU8>, wait: Duration) -> impl Fn(Ctx) -> futures_util::future::BoxFuture<'static, Result<()>> {
    move |ctx: Ctx| {
        let state = state.clone();
        Box::pin(async move {
            let scope = ctx.scope().clone();
            let watcher = tokio::spawn(async move {
                let outcome = tokio::select! {
                    _ = scope.done() => CANCELLED,
                    _ = tokio::time::sleep(wait) => FINISHED,
                };
                state.store(outcome, Ordering::SeqCst);
            });
            tokio::time::sleep(wait).await;
            let _ = watcher.await;
            ctx.send_string("done")
        })
    }
}

#[tokio::test]
async fn test_client_disconnect_cancels_request_scope() {
    let state = Arc::new(AtomicU8::new(WAITING));
    let mut server = new_server();
    server.get("/watch", watch_scope(state.clone(), Duration::from_millis(800))).unwrap();
    let srv = TestServer::spawn(server).await;

    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    assert!(impatient.get(srv.url("/watch")).send().await.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(state.load(Ordering::SeqCst), CANCELLED);
    srv.stop().await;
}

#[tokio::test]
async fn test_client_disconnect_aborts_timeout_task() {
    let finished = Arc::new(AtomicU8::new(WAITING));
    let mut server = new_server();
    server.add_middleware(Timeout::new(Duration::from_secs(5)));
    let flag = finished.clone();
    server
        .get("/slow", move |ctx: Ctx| {
            let flag = flag.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(800)).await;
                flag.store(FINISHED, Ordering::SeqCst);
                ctx.send_string("late")
            }
        })
        .unwrap();
    let srv = TestServer::spawn(server).await;

    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    assert!(impatient.get(srv.url("/slow")).send().await.is_err());

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(finished.load(Ordering::SeqCst), WAITING);
    srv.stop().await;
}

#[tokio::test]
async fn test_graceful_shutdown_drains_in_flight_requests() {
    let mut server = new_server();
    server
        .get("/slow", |ctx: Ctx| async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            ctx.send_string("done")
        })
        .unwrap();
    let srv = TestServer::spawn(server).await;
    let addr = srv.addr;

    let pending = tokio::spawn(client().get(srv.url("/slow")).send());
    tokio::time::sleep(Duration::from_millis(100)).await;
    let stopping = tokio::spawn(srv.stop());
    tokio::time::sleep(Duration::from_millis(100)).await;

    // 종료가 시작되면 새 연결은 받지 않음
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());

    let res = pending.await.unwrap().unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "done");
    stopping.await.unwrap();
}

#[tokio::test]
async fn test_forced_shutdown_cancels_request_scope() {
    let state = Arc::new(AtomicU8::new(WAITING));
    let settings = ServerSettings {
        shutdown_grace_secs: 1,
        ..ServerSettings::default()
    };
    let mut server = Server::new(settings);
    server.get("/watch", watch_scope(state.clone(), Duration::from_secs(10))).unwrap();
    let srv = TestServer::spawn(server).await;

    let pending = tokio::spawn(client().get(srv.url("/watch")).send());
    tokio::time::sleep(Duration::from_millis(100)).await;
    srv.stop().await;

    assert!(pending.await.unwrap().is_err());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(state.load(Ordering::SeqCst), CANCELLED);
}

#[tokio::test]
async fn test_stalled_request_head_is_closed() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let settings = ServerSettings {
        timeout_secs: 1,
        ..ServerSettings::default()
    };
    let srv = TestServer::spawn(Server::new(settings)).await;

    let mut stream = tokio::net::TcpStream::connect(srv.addr).await.unwrap();
    stream.write_all(b"GET /server/ready HTTP/1.1\r\n").await.unwrap();

    let started = std::time::Instant::now();
    let mut buf = [0u8; 512];
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf)).await;
    assert!(read.is_ok(), "connection should be closed by the header read timeout");
    assert!(started.elapsed() >= Duration::from_millis(900));
    srv.stop().await;
}
