//! 클라이언트 IP 기준 토큰 버킷 레이트 리미터입니다.

mod config;
mod middleware;
mod store;

pub use config::RateLimitConfig;
pub use middleware::RateLimitMiddleware;
pub use store::TokenBucketStore;

use std::sync::Arc;
use std::time::Duration;

use crate::core::data::Rule;

use super::{MiddlewareError, RuleRegistry};

pub const RULE_KIND: &str = "RateLimiter";

/// 레지스트리에 `RateLimiter` 빌더를 등록합니다.
pub fn register(registry: &mut RuleRegistry) {
    registry.register(RULE_KIND, |args| {
        let config: RateLimitConfig =
            serde_json::from_value(args.clone()).map_err(|e| MiddlewareError::InvalidArgs {
                kind: RULE_KIND.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Arc::new(RateLimitMiddleware::new(config)))
    });
}

/// 백엔드가 설정 문서에 넣을 `RateLimiter` 규칙을 만듭니다.
pub fn rule(request_limit: u32, window_duration: Duration) -> Rule {
    Rule {
        kind: RULE_KIND.to_string(),
        args: serde_json::json!({
            "request_limit": request_limit,
            "window_duration": humantime::format_duration(window_duration).to_string(),
        }),
    }
}
