//! PEM 인증서 파일로 TLS acceptor를 만듭니다.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::rustls::{self, Certificate, PrivateKey};
use tokio_rustls::TlsAcceptor;
use tracing::info;

#[derive(Debug)]
pub enum TlsError {
    /// 인증서/키 파일 읽기 실패
    Io {
        path: String,
        source: std::io::Error,
    },
    NoCertificates(String),
    NoPrivateKey(String),
    Config(rustls::Error),
}

impl fmt::Display for TlsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsError::Io { path, source } => write!(f, "{} 읽기 실패: {}", path, source),
            TlsError::NoCertificates(path) => write!(f, "{}에서 인증서를 찾을 수 없음", path),
            TlsError::NoPrivateKey(path) => write!(f, "{}에서 개인키를 찾을 수 없음", path),
            TlsError::Config(e) => write!(f, "TLS 설정 실패: {}", e),
        }
    }
}

impl std::error::Error for TlsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TlsError::Io { source, .. } => Some(source),
            TlsError::Config(e) => Some(e),
            _ => None,
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Io {
            path: path.display().to_string(),
            source,
        })
}

fn load_certs(path: &Path) -> Result<Vec<Certificate>, TlsError> {
    let mut reader = open(path)?;
    let certs: Vec<Certificate> = rustls_pemfile::certs(&mut reader)
        .map_err(|source| TlsError::Io {
            path: path.display().to_string(),
            source,
        })?
        .into_iter()
        .map(Certificate)
        .collect();

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.display().to_string()));
    }
    Ok(certs)
}

/// PKCS#8 키를 먼저 찾고, 없으면 RSA(PKCS#1) 키를 찾습니다.
fn load_key(path: &Path) -> Result<PrivateKey, TlsError> {
    let io_err = |source| TlsError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut reader = open(path)?;
    if let Some(key) = rustls_pemfile::pkcs8_private_keys(&mut reader).map_err(io_err)?.into_iter().next() {
        return Ok(PrivateKey(key));
    }

    let mut reader = open(path)?;
    rustls_pemfile::rsa_private_keys(&mut reader)
        .map_err(io_err)?
        .into_iter()
        .next()
        .map(PrivateKey)
        .ok_or_else(|| TlsError::NoPrivateKey(path.display().to_string()))
}

pub fn load_acceptor(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<TlsAcceptor, TlsError> {
    let cert_path = cert_path.as_ref();
    let key_path = key_path.as_ref();
    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let config = rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(TlsError::Config)?;

    info!(cert = %cert_path.display(), "TLS 인증서 로드 완료");
    Ok(TlsAcceptor::from(Arc::new(config)))
}
