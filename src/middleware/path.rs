//! 요청 경로를 고쳐 쓰는 미들웨어들입니다.
//!
//! 상태가 없으므로 캐시되지 않고 요청마다 새로 만들어집니다.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use hyper::Uri;
use serde::Deserialize;

use super::{Middleware, MiddlewareError, Request, Response, RuleRegistry};

pub const APPEND_PATH_KIND: &str = "AppendPath";
pub const REPLACE_PATH_KIND: &str = "ReplacePath";

/// 레지스트리에 `AppendPath` 빌더를 등록합니다.
pub fn register_append_path(registry: &mut RuleRegistry) {
    registry.register(APPEND_PATH_KIND, |args| {
        let middleware: AppendPath =
            serde_json::from_value(args.clone()).map_err(|e| MiddlewareError::InvalidArgs {
                kind: APPEND_PATH_KIND.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Arc::new(middleware))
    });
}

/// 레지스트리에 `ReplacePath` 빌더를 등록합니다.
pub fn register_replace_path(registry: &mut RuleRegistry) {
    registry.register(REPLACE_PATH_KIND, |args| {
        let middleware: ReplacePath =
            serde_json::from_value(args.clone()).map_err(|e| MiddlewareError::InvalidArgs {
                kind: REPLACE_PATH_KIND.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Arc::new(middleware))
    });
}

/// 경로 앞뒤에 세그먼트를 덧붙입니다. `begin` + 원래 경로 + `end`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppendPath {
    #[serde(default)]
    begin: String,
    #[serde(default)]
    end: String,
}

#[async_trait]
impl Middleware for AppendPath {
    async fn handle_request(&self, req: Request) -> Result<Request, MiddlewareError> {
        let path = format!("{}{}{}", self.begin, req.uri().path(), self.end);
        rewrite_path(req, &path)
    }

    async fn handle_response(&self, res: Response) -> Result<Response, MiddlewareError> {
        Ok(res)
    }

    fn update(self: Arc<Self>, _newer: Option<Arc<dyn Middleware>>) -> Arc<dyn Middleware> {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 경로를 통째로 `path`로 바꿉니다.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplacePath {
    path: String,
}

#[async_trait]
impl Middleware for ReplacePath {
    async fn handle_request(&self, req: Request) -> Result<Request, MiddlewareError> {
        rewrite_path(req, &self.path)
    }

    async fn handle_response(&self, res: Response) -> Result<Response, MiddlewareError> {
        Ok(res)
    }

    fn update(self: Arc<Self>, _newer: Option<Arc<dyn Middleware>>) -> Arc<dyn Middleware> {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 쿼리 스트링은 유지한 채 경로만 바꿔 URI를 다시 조립합니다.
fn rewrite_path(req: Request, new_path: &str) -> Result<Request, MiddlewareError> {
    let (mut parts, body) = req.into_parts();

    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{}?{}", new_path, query),
        None => new_path.to_string(),
    };

    let mut uri_parts = parts.uri.into_parts();
    uri_parts.path_and_query = Some(
        path_and_query
            .parse()
            .map_err(|e| MiddlewareError::InvalidRequest(format!("잘못된 경로 {}: {}", new_path, e)))?,
    );

    parts.uri = Uri::from_parts(uri_parts)
        .map_err(|e| MiddlewareError::InvalidRequest(e.to_string()))?;

    Ok(Request::from_parts(parts, body))
}
