use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use super::{MiddlewareError, Request, Response};

#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    // 요청 처리. 요청을 고쳐서 넘기거나, 에러로 응답을 단락시킬 수 있습니다.
    async fn handle_request(&self, req: Request) -> Result<Request, MiddlewareError>;

    // 응답 처리
    async fn handle_response(&self, res: Response) -> Result<Response, MiddlewareError>;

    /// 캐시 대상 여부. 요청 사이에 유지해야 할 상태가 있는 미들웨어만 true입니다.
    fn is_cachable(&self) -> bool {
        false
    }

    /// 캐시된 인스턴스의 설정 갱신입니다.
    ///
    /// 첫 등록 시에는 `newer`가 `None`으로 호출되고, 이후에는 기존 인스턴스가
    /// 새 인스턴스의 채택 여부를 결정합니다. 레이트 리미터는 설정이 같으면
    /// 기존 버킷을 유지하고, 다르면 새 인스턴스로 교체합니다.
    fn update(self: Arc<Self>, newer: Option<Arc<dyn Middleware>>) -> Arc<dyn Middleware>;

    fn as_any(&self) -> &dyn Any;
}
