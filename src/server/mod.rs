//! HTTP 서버
//!
//! 라우트와 미들웨어를 등록받아 시작 시점에 라우트별 체인을 고정하고,
//! 연결마다 태스크를 띄워 요청을 처리합니다.

mod error;
mod error_handler;
mod handler;
mod listener;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use bytes::Bytes;
use http_body_util::Empty;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use crate::context::Ctx;
use crate::error::{Error, HttpError};
use crate::middleware::{Handler, HandlerChain};
use crate::routing::{Group, Method, RouteTable};
use crate::settings::ServerSettings;
use handler::RequestHandler;

pub use error::ServerError;
pub use error_handler::{default_error_handler, error_view, ErrorHandler};

pub type Result<T> = std::result::Result<T, ServerError>;

/// 준비 상태 확인 경로
pub const READY_PATH: &str = "/server/ready";

const READY_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const READY_WAIT_LIMIT: Duration = Duration::from_secs(10);
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Server {
    settings: ServerSettings,
    middleware: HandlerChain,
    routes: RouteTable,
    error_handler: ErrorHandler,
}

async fn not_found(_ctx: Ctx) -> crate::error::Result<()> {
    Err(HttpError::not_found().into())
}

async fn ready(ctx: Ctx) -> crate::error::Result<()> {
    ctx.send_string("OK")
}

impl Server {
    /// 기본 라우트 `ANY /`(404)와 `GET /server/ready`를 등록한 서버를 만듭니다.
    pub fn new(settings: ServerSettings) -> Self {
        let mut server = Self {
            settings,
            middleware: HandlerChain::new(),
            routes: RouteTable::new(),
            error_handler: error_handler::default_handler(),
        };

        let mut catch_all = HandlerChain::new();
        catch_all.add(not_found);
        let mut probe = HandlerChain::new();
        probe.add(ready);

        for (method, path, chain) in [(Method::Any, "/", catch_all), (Method::Get, READY_PATH, probe)] {
            if let Err(e) = server.routes.add(method, path, chain) {
                error!(path, error = %e, "내장 라우트 등록 실패");
            }
        }
        server
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// 모든 라우트 앞에 실행될 미들웨어를 추가합니다. 등록 순서대로 실행됩니다.
    pub fn add_middleware<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.middleware.add(handler);
        self
    }

    pub fn add_middleware_arc(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.middleware.push(handler);
        self
    }

    pub fn error_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&Ctx, &Error) + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    /// 라우트를 등록합니다. `:name`과 `{name}` 파라미터 문법을 모두 받습니다.
    ///
    /// 메서드는 [`Method`] 또는 문자열로 지정하며, 알 수 없는 문자열은 GET으로 등록됩니다.
    pub fn route<M, H>(&mut self, method: M, path: &str, handler: H) -> Result<&mut Self>
    where
        M: Into<Method>,
        H: Handler,
    {
        let mut handlers = HandlerChain::new();
        handlers.add(handler);
        self.routes.add(method.into(), path, handlers)?;
        Ok(self)
    }

    pub fn get<H: Handler>(&mut self, path: &str, handler: H) -> Result<&mut Self> {
        self.route(Method::Get, path, handler)
    }

    pub fn post<H: Handler>(&mut self, path: &str, handler: H) -> Result<&mut Self> {
        self.route(Method::Post, path, handler)
    }

    pub fn put<H: Handler>(&mut self, path: &str, handler: H) -> Result<&mut Self> {
        self.route(Method::Put, path, handler)
    }

    pub fn patch<H: Handler>(&mut self, path: &str, handler: H) -> Result<&mut Self> {
        self.route(Method::Patch, path, handler)
    }

    pub fn delete<H: Handler>(&mut self, path: &str, handler: H) -> Result<&mut Self> {
        self.route(Method::Delete, path, handler)
    }

    pub fn any<H: Handler>(&mut self, path: &str, handler: H) -> Result<&mut Self> {
        self.route(Method::Any, path, handler)
    }

    /// 접두사와 그룹 미들웨어를 공유하는 라우트 그룹을 만듭니다.
    pub fn group(&mut self, prefix: &str, middleware: HandlerChain) -> Group<'_> {
        Group::new(&mut self.routes, prefix, middleware)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    fn into_handler(self) -> (Arc<RequestHandler>, ServerSettings) {
        debug!(middleware = ?self.middleware, routes = self.routes.len(), "라우트 체인 고정");
        let router = self.routes.freeze(&self.middleware);
        let handler = RequestHandler::new(router, self.error_handler, self.settings.header_read_timeout());
        (Arc::new(handler), self.settings)
    }

    /// 주어진 리스너로 요청을 처리합니다. `shutdown`이 취소되면 정상 종료합니다.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let (handler, settings) = self.into_handler();
        info!(addr = %listener.local_addr()?, "HTTP 서버 시작");
        listener::run(listener, None, handler, shutdown, settings.shutdown_grace()).await;
        Ok(())
    }

    pub async fn serve_tls(self, listener: TcpListener, acceptor: TlsAcceptor, shutdown: CancellationToken) -> Result<()> {
        let (handler, settings) = self.into_handler();
        info!(addr = %listener.local_addr()?, "HTTPS 서버 시작");
        listener::run(listener, Some(acceptor), handler, shutdown, settings.shutdown_grace()).await;
        Ok(())
    }

    async fn bind(&self) -> Result<TcpListener> {
        let addr = self.settings.addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// 설정된 주소에 바인딩하고 백그라운드에서 서버를 실행합니다.
    pub async fn start(self) -> Result<ServerHandle> {
        self.spawn(None).await
    }

    pub async fn start_tls(self, acceptor: TlsAcceptor) -> Result<ServerHandle> {
        self.spawn(Some(acceptor)).await
    }

    async fn spawn(self, tls: Option<TlsAcceptor>) -> Result<ServerHandle> {
        let listener = self.bind().await?;
        let local_addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let https = tls.is_some();
        let task = match tls {
            Some(acceptor) => tokio::spawn(self.serve_tls(listener, acceptor, shutdown.clone())),
            None => tokio::spawn(self.serve(listener, shutdown.clone())),
        };

        Ok(ServerHandle {
            local_addr,
            https,
            shutdown,
            task,
        })
    }

    /// SIGINT 또는 SIGTERM을 받을 때까지 서버를 실행한 뒤 `on_shutdown`을 실행합니다.
    pub async fn listen_and_shutdown<F>(self, on_shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let handle = self.start().await?;
        wait_and_shutdown(handle, on_shutdown).await
    }

    pub async fn listen_and_shutdown_tls<F>(self, acceptor: TlsAcceptor, on_shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let handle = self.start_tls(acceptor).await?;
        wait_and_shutdown(handle, on_shutdown).await
    }
}

async fn wait_and_shutdown<F>(handle: ServerHandle, on_shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    info!(addr = %handle.local_addr(), "서버 실행 중");
    shutdown_signal().await?;
    let result = handle.shutdown().await;
    on_shutdown.await;
    result
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    info!("종료 신호 수신");
    Ok(())
}

/// 실행 중인 서버 핸들
pub struct ServerHandle {
    local_addr: SocketAddr,
    https: bool,
    shutdown: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `http://<주소>` 또는 `https://<주소>`
    pub fn url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}", scheme, self.local_addr)
    }

    /// `GET /server/ready`가 2초 안에 200을 반환하는지 확인합니다.
    ///
    /// 평문 HTTP로만 확인하므로 TLS 서버는 항상 `false`입니다.
    pub async fn is_ready(&self) -> bool {
        if self.https {
            return false;
        }
        let Ok(uri) = format!("{}{}", self.url(), READY_PATH).parse::<hyper::Uri>() else {
            return false;
        };
        let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();

        match tokio::time::timeout(READY_PROBE_TIMEOUT, client.get(uri)).await {
            Ok(Ok(response)) => response.status() == hyper::StatusCode::OK,
            _ => false,
        }
    }

    /// 준비될 때까지 1초 간격으로 최대 10초 동안 확인합니다.
    pub async fn wait_until_ready(&self) -> bool {
        let started = tokio::time::Instant::now();
        loop {
            if self.is_ready().await {
                return true;
            }
            if started.elapsed() > READY_WAIT_LIMIT {
                return false;
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// 정상 종료를 요청하고 서버 태스크가 끝날 때까지 기다립니다.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.cancel();
        self.task.await.map_err(ServerError::Join)?
    }
}
