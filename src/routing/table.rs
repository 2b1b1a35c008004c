use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tracing::{debug, warn};
use crate::context::Ctx;
use crate::error::{HttpError, Result};
use crate::middleware::{Chain, Handler, HandlerChain};
use super::{Method, PathPattern, RoutingError};

/// 루트 패턴 `/`에 붙는 가드
///
/// `/`는 모든 경로에 매칭되므로 정확히 `/`가 아닌 요청은 404로 끝냅니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFoundGuard;

#[async_trait]
impl Handler for NotFoundGuard {
    async fn handle(&self, ctx: Ctx) -> Result<()> {
        if ctx.path() != "/" {
            return Err(HttpError::not_found().into());
        }
        ctx.next().await
    }

    fn name(&self) -> &str {
        "not_found_guard"
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    /// 그룹 미들웨어와 라우트 핸들러. 서버 미들웨어는 freeze 시점에 앞에 붙습니다.
    pub handlers: HandlerChain,
}

/// 라우트 등록 테이블
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 라우트를 등록합니다. 같은 메서드와 같은 모양의 패턴이 이미 있으면 교체합니다.
    pub fn add(&mut self, method: Method, pattern: &str, handlers: HandlerChain) -> std::result::Result<(), RoutingError> {
        let pattern = PathPattern::parse(pattern)?;
        debug!(method = %method, pattern = %pattern.as_str(), handlers = ?handlers, "라우트 등록");

        let route = Route { method, pattern, handlers };
        match self
            .routes
            .iter_mut()
            .find(|r| r.method == route.method && r.pattern.shape() == route.pattern.shape())
        {
            Some(existing) => {
                warn!(method = %method, pattern = %route.pattern.as_str(), "기존 라우트를 교체합니다");
                *existing = route;
            }
            None => self.routes.push(route),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// 라우트마다 최종 체인을 한 번 만들어 둡니다.
    ///
    /// 체인 순서: 서버 미들웨어, (루트 패턴이면) [`NotFoundGuard`], 그룹 미들웨어, 핸들러.
    pub fn freeze(&self, middleware: &HandlerChain) -> Router {
        let routes = self
            .routes
            .iter()
            .map(|route| {
                let mut chain = middleware.clone();
                if route.pattern.is_root() {
                    chain.add(NotFoundGuard);
                }
                chain.extend(&route.handlers);
                FrozenRoute {
                    method: route.method,
                    pattern: route.pattern.clone(),
                    chain: chain.freeze(),
                }
            })
            .collect();
        Router { routes }
    }
}

#[derive(Clone)]
struct FrozenRoute {
    method: Method,
    pattern: PathPattern,
    chain: Chain,
}

/// 매칭 결과
pub struct RouteMatch {
    pub method: Method,
    pub pattern: String,
    pub chain: Chain,
    pub params: HashMap<String, String>,
}

/// 요청 시점 조회용 불변 라우팅 테이블
#[derive(Clone)]
pub struct Router {
    routes: Arc<[FrozenRoute]>,
}

impl Router {
    /// 가장 구체적인 패턴을 고르고, 같은 패턴이면 메서드를 지정한 라우트가 `ANY`보다 우선합니다.
    pub fn lookup(&self, method: &hyper::Method, path: &str) -> Option<RouteMatch> {
        let mut best: Option<(&FrozenRoute, HashMap<String, String>)> = None;

        for route in self.routes.iter() {
            if !route.method.matches(method) {
                continue;
            }
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((current, _)) => rank(route) > rank(current),
            };
            if better {
                best = Some((route, params));
            }
        }

        best.map(|(route, params)| RouteMatch {
            method: route.method,
            pattern: route.pattern.as_str().to_string(),
            chain: route.chain.clone(),
            params,
        })
    }
}

fn rank(route: &FrozenRoute) -> ((Vec<u8>, bool), bool) {
    (route.pattern.specificity(), route.method != Method::Any)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_named(name: &'static str) -> HandlerChain {
        let mut chain = HandlerChain::new();
        chain.add(move |ctx: Ctx| async move { ctx.send_string(name) });
        chain
    }

    fn table() -> Router {
        let mut table = RouteTable::new();
        table.add(Method::Any, "/", chain_named("root")).unwrap();
        table.add(Method::Get, "/users/{id}", chain_named("user")).unwrap();
        table.add(Method::Get, "/users/me", chain_named("me")).unwrap();
        table.add(Method::Any, "/items/{id}", chain_named("any-item")).unwrap();
        table.add(Method::Delete, "/items/{id}", chain_named("delete-item")).unwrap();
        table.freeze(&HandlerChain::new())
    }

    #[test]
    fn test_lookup_prefers_specific_patterns() {
        let router = table();
        let cases = vec![
            (hyper::Method::GET, "/users/me", "/users/me"),
            (hyper::Method::GET, "/users/42", "/users/{id}"),
            (hyper::Method::HEAD, "/users/42", "/users/{id}"),
            (hyper::Method::POST, "/users/42", "/"),
            (hyper::Method::GET, "/nowhere", "/"),
        ];
        for (method, path, expected) in cases {
            let found = router.lookup(&method, path).unwrap();
            assert_eq!(found.pattern, expected, "{} {}", method, path);
        }
    }

    #[test]
    fn test_method_route_beats_any() {
        let router = table();
        assert_eq!(router.lookup(&hyper::Method::DELETE, "/items/1").unwrap().method, Method::Delete);
        assert_eq!(router.lookup(&hyper::Method::PUT, "/items/1").unwrap().method, Method::Any);
    }

    #[test]
    fn test_root_chain_gets_not_found_guard() {
        let router = table();
        let root = router.lookup(&hyper::Method::GET, "/x").unwrap();
        assert_eq!(root.chain.len(), 2);
        assert_eq!(root.chain[0].name(), "not_found_guard");

        let user = router.lookup(&hyper::Method::GET, "/users/1").unwrap();
        assert_eq!(user.chain.len(), 1);
        assert_eq!(user.params["id"], "1");
    }

    #[test]
    fn test_duplicate_route_is_replaced() {
        let mut table = RouteTable::new();
        table.add(Method::Get, "/a/{x}", chain_named("first")).unwrap();
        table.add(Method::Get, "/a/:y", chain_named("second")).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.routes()[0].pattern.as_str(), "/a/{y}");
    }
}
