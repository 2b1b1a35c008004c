use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use crate::context::{Ctx, RequestInfo};
use crate::error::HttpError;
use crate::routing::Router;
use crate::scope::Scope;
use super::error_handler::ErrorHandler;

/// 요청 하나를 라우팅하고 체인을 실행해 응답을 만듭니다.
///
/// 요청 범위는 모두 `requests` 토큰의 자식이며, 요청 future가 drop되면
/// (클라이언트 연결 끊김, 연결 강제 종료) 해당 요청의 범위가 취소됩니다.
pub struct RequestHandler {
    router: Router,
    error_handler: ErrorHandler,
    header_read_timeout: Duration,
    requests: CancellationToken,
}

impl RequestHandler {
    pub fn new(router: Router, error_handler: ErrorHandler, header_read_timeout: Duration) -> Self {
        Self {
            router,
            error_handler,
            header_read_timeout,
            requests: CancellationToken::new(),
        }
    }

    /// 진행 중인 모든 요청의 범위를 취소합니다.
    pub(crate) fn cancel_requests(&self) {
        self.requests.cancel();
    }

    pub async fn handle_request(
        &self,
        req: Request<Incoming>,
        remote_addr: Option<SocketAddr>,
        https: bool,
    ) -> Response<Full<Bytes>> {
        let found = self.router.lookup(req.method(), req.uri().path());
        let mut info = RequestInfo::from_hyper(req, remote_addr, https);
        let scope = Scope::within(&self.requests);
        let _cancel_on_drop = scope.drop_guard();

        let ctx = match found {
            Some(found) => {
                trace!(method = %found.method, pattern = %found.pattern, "라우트 매칭");
                info.set_params(found.params);
                Ctx::new(info, found.chain, scope)
            }
            None => {
                let ctx = Ctx::new(info, Arc::from(Vec::new()), scope);
                (self.error_handler)(&ctx, &HttpError::not_found().into());
                return ctx.take_response();
            }
        };

        if let Err(e) = ctx.next().await {
            (self.error_handler)(&ctx, &e);
        }
        ctx.take_response()
    }

    /// 연결 하나를 처리합니다. 종료 토큰이 취소되면 진행 중인 요청을 마친 뒤 연결을 닫습니다.
    pub async fn handle_connection<I>(
        self: Arc<Self>,
        io: I,
        remote_addr: SocketAddr,
        https: bool,
        shutdown: CancellationToken,
    ) -> Result<(), hyper::Error>
    where
        I: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let handler = self.clone();
        let service = service_fn(move |req| {
            let handler = handler.clone();
            async move { Ok::<_, Infallible>(handler.handle_request(req, Some(remote_addr), https).await) }
        });

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(self.header_read_timeout);

        let conn = builder.serve_connection(TokioIo::new(io), service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            _ = shutdown.cancelled() => {
                debug!(remote = %remote_addr, "연결 정상 종료 시작");
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }
}
