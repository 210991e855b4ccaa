use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::StatusCode;
use tracing::{debug, error};

use crate::middleware::{Middleware, MiddlewareError, Request, Response};

use super::{RateLimitConfig, TokenBucketStore};

/// Rate Limit 미들웨어
pub struct RateLimitMiddleware {
    config: RateLimitConfig,
    store: TokenBucketStore,
}

impl RateLimitMiddleware {
    pub fn new(config: RateLimitConfig) -> Self {
        let store = TokenBucketStore::new(config.request_limit, config.window_duration);
        Self { config, store }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// 클라이언트 식별자를 추출합니다.
    fn get_client_id(req: &Request) -> String {
        // X-Forwarded-For 헤더 확인
        if let Some(forwarded) = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
        {
            if let Some(ip) = forwarded.split(',').next() {
                return ip.trim().to_string();
            }
        }

        // X-Real-IP 헤더 확인
        if let Some(real_ip) = req
            .headers()
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
        {
            return real_ip.to_string();
        }

        // 헤더가 없는 경우 기본값 사용
        "unknown".to_string()
    }

    /// Rate Limit 초과 응답을 생성합니다.
    async fn create_limit_exceeded_response(&self, key: &str) -> Response {
        let wait_time = self
            .store
            .time_to_next_request(key)
            .await
            .unwrap_or_default();

        hyper::Response::builder()
            .status(StatusCode::TOO_MANY_REQUESTS)
            .header("X-RateLimit-Limit", self.config.request_limit.to_string())
            .header("Retry-After", wait_time.as_secs().max(1).to_string())
            .body(Full::new(Bytes::from("rate limit exceeded")))
            .unwrap_or_else(|_| {
                let mut response =
                    hyper::Response::new(Full::new(Bytes::from("rate limit exceeded")));
                *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
                response
            })
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle_request(&self, req: Request) -> Result<Request, MiddlewareError> {
        let client_id = Self::get_client_id(&req);
        debug!(client_id = %client_id, "rate limit 확인");

        if self.store.check(&client_id).await {
            Ok(req)
        } else {
            let response = self.create_limit_exceeded_response(&client_id).await;
            Err(MiddlewareError::TooManyRequests(response))
        }
    }

    async fn handle_response(&self, res: Response) -> Result<Response, MiddlewareError> {
        Ok(res)
    }

    fn is_cachable(&self) -> bool {
        true
    }

    fn update(self: Arc<Self>, newer: Option<Arc<dyn Middleware>>) -> Arc<dyn Middleware> {
        let Some(newer) = newer else {
            debug!(
                request_limit = self.config.request_limit,
                window_duration = ?self.config.window_duration,
                "레이트 리미터 초기화"
            );
            return self;
        };

        match newer.as_any().downcast_ref::<RateLimitMiddleware>() {
            // 설정이 그대로면 기존 버킷을 유지
            Some(latest) if latest.config == self.config => self,
            Some(latest) => {
                debug!(
                    request_limit = latest.config.request_limit,
                    window_duration = ?latest.config.window_duration,
                    "레이트 리미터 설정 변경, 버킷을 다시 만듭니다"
                );
                newer
            }
            None => {
                error!("레이트 리미터 갱신 실패: 캐시된 타입이 일치하지 않음");
                self
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
