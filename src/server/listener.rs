use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use super::handler::RequestHandler;

/// 연결 수락 루프
///
/// 종료 토큰이 취소되면 새 연결 수락을 멈추고, 진행 중인 연결이 끝나기를
/// `grace` 동안 기다린 뒤 남은 요청의 범위를 취소하고 연결을 강제로 닫습니다.
pub(crate) async fn run(
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    handler: Arc<RequestHandler>,
    shutdown: CancellationToken,
    grace: Duration,
) {
    let https = tls.is_some();
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, remote_addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!(error = %e, "연결 수락 실패");
                        continue;
                    }
                };
                let handler = handler.clone();
                let shutdown = shutdown.clone();
                let tls = tls.clone();

                connections.spawn(async move {
                    let result = match tls {
                        Some(acceptor) => match acceptor.accept(stream).await {
                            Ok(stream) => handler.handle_connection(stream, remote_addr, true, shutdown).await,
                            Err(e) => {
                                warn!(error = %e, remote = %remote_addr, "TLS 핸드쉐이크 실패");
                                return;
                            }
                        },
                        None => handler.handle_connection(stream, remote_addr, false, shutdown).await,
                    };
                    if let Err(e) = result {
                        debug!(error = %e, remote = %remote_addr, "연결 처리 종료");
                    }
                });
            }
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!(error = %e, "연결 태스크 패닉");
                    }
                }
            }
        }
    }

    drop(listener);
    let in_flight = connections.len();
    info!(in_flight, https, "서버 종료 중, 진행 중인 연결을 기다립니다");

    let drained = tokio::time::timeout(grace, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            remaining = connections.len(),
            grace_secs = grace.as_secs(),
            "종료 대기 시간 초과, 남은 연결을 강제로 닫습니다"
        );
        handler.cancel_requests();
        connections.abort_all();
        while connections.join_next().await.is_some() {}
    }
    info!("서버 종료 완료");
}
