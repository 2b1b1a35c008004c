use std::sync::Arc;
use super::Handler;

/// 요청마다 실행될 불변 핸들러 목록
pub type Chain = Arc<[Arc<dyn Handler>]>;

/// 핸들러 체인 빌더
///
/// 등록 순서대로 실행됩니다. 라우트 테이블은 서버 시작 시점에
/// 라우트마다 한 번 [`HandlerChain::freeze`]를 호출해 둡니다.
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn add<H: Handler>(&mut self, handler: H) {
        self.handlers.push(Arc::new(handler));
    }

    pub fn push(&mut self, handler: Arc<dyn Handler>) {
        self.handlers.push(handler);
    }

    pub fn extend(&mut self, other: &HandlerChain) {
        self.handlers.extend(other.handlers.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn freeze(&self) -> Chain {
        self.handlers.iter().cloned().collect()
    }
}

impl std::fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
