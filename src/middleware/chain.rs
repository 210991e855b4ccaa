use std::sync::Arc;

use super::{Middleware, MiddlewareError, Request, Response};

/// 규칙 순서대로 조립된 미들웨어 체인입니다. 첫 규칙이 가장 바깥쪽으로,
/// 요청은 앞에서 뒤로, 응답은 뒤에서 앞으로 흐릅니다.
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self { middlewares }
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub async fn handle_request(&self, mut request: Request) -> Result<Request, MiddlewareError> {
        for middleware in &self.middlewares {
            request = middleware.handle_request(request).await?;
        }
        Ok(request)
    }

    pub async fn handle_response(&self, mut response: Response) -> Result<Response, MiddlewareError> {
        // 응답은 역순으로 처리
        for middleware in self.middlewares.iter().rev() {
            response = middleware.handle_response(response).await?;
        }
        Ok(response)
    }
}
