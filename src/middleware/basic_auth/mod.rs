//! Basic 인증 미들웨어

mod auth;
mod config;
mod middleware;

pub use auth::{Authenticator, CredentialAuthenticator};
pub use config::BasicAuthConfig;
pub use middleware::BasicAuth;
