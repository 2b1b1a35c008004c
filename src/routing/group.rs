use crate::middleware::{Handler, HandlerChain};
use super::{Method, RouteTable, RoutingError};

/// 접두사와 미들웨어를 공유하는 라우트 묶음
///
/// 그룹에 등록된 라우트의 체인은 서버 미들웨어, 그룹 미들웨어, 핸들러 순서입니다.
/// 중첩 그룹은 접두사를 이어 붙이고 미들웨어를 뒤에 추가합니다.
pub struct Group<'a> {
    table: &'a mut RouteTable,
    prefix: String,
    middleware: HandlerChain,
}

pub(crate) fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if path.is_empty() {
        return format!("{}/", prefix);
    }
    if path.starts_with('/') {
        format!("{}{}", prefix, path)
    } else {
        format!("{}/{}", prefix, path)
    }
}

impl<'a> Group<'a> {
    pub(crate) fn new(table: &'a mut RouteTable, prefix: &str, middleware: HandlerChain) -> Self {
        Self {
            table,
            prefix: prefix.trim_end_matches('/').to_string(),
            middleware,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 이후 등록되는 라우트에 미들웨어를 추가합니다.
    pub fn add_middleware<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.middleware.add(handler);
        self
    }

    pub fn group(&mut self, prefix: &str, middleware: HandlerChain) -> Group<'_> {
        let mut chain = self.middleware.clone();
        chain.extend(&middleware);
        let prefix = join_paths(&self.prefix, prefix);
        Group::new(&mut *self.table, &prefix, chain)
    }

    pub fn route<H: Handler>(&mut self, method: Method, path: &str, handler: H) -> Result<&mut Self, RoutingError> {
        let mut handlers = self.middleware.clone();
        handlers.add(handler);
        self.table.add(method, &join_paths(&self.prefix, path), handlers)?;
        Ok(self)
    }

    pub fn get<H: Handler>(&mut self, path: &str, handler: H) -> Result<&mut Self, RoutingError> {
        self.route(Method::Get, path, handler)
    }

    pub fn post<H: Handler>(&mut self, path: &str, handler: H) -> Result<&mut Self, RoutingError> {
        self.route(Method::Post, path, handler)
    }

    pub fn put<H: Handler>(&mut self, path: &str, handler: H) -> Result<&mut Self, RoutingError> {
        self.route(Method::Put, path, handler)
    }

    pub fn patch<H: Handler>(&mut self, path: &str, handler: H) -> Result<&mut Self, RoutingError> {
        self.route(Method::Patch, path, handler)
    }

    pub fn delete<H: Handler>(&mut self, path: &str, handler: H) -> Result<&mut Self, RoutingError> {
        self.route(Method::Delete, path, handler)
    }
}
