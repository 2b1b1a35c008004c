//! 메서드와 경로 패턴으로 핸들러 체인을 찾는 라우터

mod error;
mod group;
mod method;
mod pattern;
mod table;

pub use error::RoutingError;
pub use group::Group;
pub use method::Method;
pub use pattern::{rewrite_params, PathPattern};
pub use table::{NotFoundGuard, Route, RouteMatch, RouteTable, Router};
