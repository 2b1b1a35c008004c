use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use crate::settings::{LogFormat, LogOutput, LogSettings};

/// 전역 tracing 구독자를 설치합니다.
///
/// 출력은 논블로킹 writer를 거치므로 반환된 guard를 프로세스가 끝날 때까지 들고 있어야
/// 남은 로그가 모두 기록됩니다. 이미 구독자가 설치돼 있으면 아무것도 바꾸지 않습니다.
pub fn init_logging(settings: &LogSettings) -> WorkerGuard {
    let (writer, guard) = match &settings.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::File(path) => {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "martian.log".into());
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name))
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true);

    let result = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_file(true).with_line_number(true).try_init(),
    };

    if result.is_err() {
        debug!("tracing 구독자가 이미 설치되어 있습니다");
    }
    guard
}

/// 요청 하나의 처리 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestLog {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub client_ip: String,
    pub session_id: Option<String>,
    pub status_code: u16,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl RequestLog {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Default::default()
        }
    }

    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.duration_ms = elapsed.as_millis() as u64;
        self
    }

    pub fn with_error(mut self, error: impl std::fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

pub fn log_request(log: &RequestLog) {
    let session_id = log.session_id.as_deref().unwrap_or("-");

    if log.error.is_some() && log.status_code >= 500 {
        error!(
            request_id = %log.request_id,
            method = %log.method,
            path = %log.path,
            client_ip = %log.client_ip,
            session_id = %session_id,
            status = log.status_code,
            duration_ms = log.duration_ms,
            error = ?log.error,
            "Request failed"
        );
    } else if log.status_code >= 400 {
        warn!(
            request_id = %log.request_id,
            method = %log.method,
            path = %log.path,
            client_ip = %log.client_ip,
            session_id = %session_id,
            status = log.status_code,
            duration_ms = log.duration_ms,
            error = ?log.error,
            "Request completed with warning"
        );
    } else {
        info!(
            request_id = %log.request_id,
            method = %log.method,
            path = %log.path,
            client_ip = %log.client_ip,
            session_id = %session_id,
            status = log.status_code,
            duration_ms = log.duration_ms,
            "Request completed successfully"
        );
    }
}

/// Log 미들웨어가 완료된 요청을 넘기는 대상
pub trait RequestLogger: Send + Sync {
    fn log(&self, entry: &RequestLog);
}

/// [`log_request`]로 tracing에 기록하는 기본 로거
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl RequestLogger for TracingLogger {
    fn log(&self, entry: &RequestLog) {
        log_request(entry);
    }
}
