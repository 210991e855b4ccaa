use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{self, HeaderValue};
use hyper::{Request, Response, StatusCode};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::core::ActionRunner;
use crate::middleware::{handle_middleware_error, MiddlewareCache, RuleRegistry};
use crate::proxy::{self, ProxyClient};

pub struct RequestHandler {
    driver: Arc<ActionRunner>,
    registry: Arc<RuleRegistry>,
    cache: MiddlewareCache,
    proxy: ProxyClient,
}

impl RequestHandler {
    pub fn new(
        driver: Arc<ActionRunner>,
        registry: Arc<RuleRegistry>,
        cache: MiddlewareCache,
    ) -> Self {
        Self {
            driver,
            registry,
            cache,
            proxy: ProxyClient::new(),
        }
    }

    pub async fn handle(
        &self,
        req: Request<Incoming>,
        client_addr: SocketAddr,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let domain = extract_domain(&req);
        let path = req.uri().path().to_string();
        let method = req.method().to_string();
        let start = Instant::now();

        let response = self.serve(req, &domain, &path, client_addr).await;

        // 결과와 무관하게 항상 기록합니다
        crate::metrics::record_request(
            &domain,
            &path,
            &method,
            response.status().as_u16(),
            start.elapsed(),
        );

        Ok(response)
    }

    async fn serve(
        &self,
        mut req: Request<Incoming>,
        domain: &str,
        path: &str,
        client_addr: SocketAddr,
    ) -> Response<Full<Bytes>> {
        let request_id = Uuid::new_v4().to_string();

        // 1. 라우팅. 요청 경로에서 기다리는 지점은 이 Get 하나뿐입니다.
        let Some((container, endpoint)) = self.driver.get(domain, path).await else {
            debug!(request_id = %request_id, domain, path, "매칭되는 백엔드 없음");
            return proxy::build_error_response(
                StatusCode::NOT_FOUND,
                format!("not found, domain: {}, path: {}", domain, path),
            );
        };

        let Some(addr) = container.addr else {
            warn!(
                request_id = %request_id,
                container_id = %container.id,
                "컨테이너 주소가 아직 확인되지 않음"
            );
            return proxy::build_error_response(
                StatusCode::BAD_GATEWAY,
                "backend address not available".to_string(),
            );
        };

        debug!(
            request_id = %request_id,
            container_id = %container.id,
            backend = %addr,
            "백엔드 선택"
        );

        set_forwarded_headers(&mut req, client_addr);

        // 2. 미들웨어 체인 조립. 실패하면 부분 체인으로 진행하지 않습니다.
        let chain = match self.registry.build_chain(&endpoint, &self.cache) {
            Ok(chain) => chain,
            Err(e) => {
                error!(request_id = %request_id, error = %e, "미들웨어 체인 구성 실패");
                return proxy::build_error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                );
            }
        };

        // 3. 요청 미들웨어 처리
        let req = match chain.handle_request(req).await {
            Ok(req) => req,
            Err(e) => return handle_middleware_error(e),
        };

        // 4. 프록시
        let response = if proxy::is_upgrade_request(&req) {
            self.proxy.proxy_upgrade(addr, req, &request_id).await
        } else {
            self.proxy.proxy_request(addr, req).await
        };

        // 5. 응답 미들웨어 처리
        match chain.handle_response(response).await {
            Ok(response) => response,
            Err(e) => handle_middleware_error(e),
        }
    }
}

/// Host 헤더에서 포트를 뗀 도메인을 추출합니다.
fn extract_domain<B>(req: &Request<B>) -> String {
    req.headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().host())
        .map(|h| h.split(':').next().unwrap_or(h).to_lowercase())
        .unwrap_or_default()
}

/// 표준 X-Forwarded-* 헤더를 채웁니다.
///
/// 이 프록시가 첫 신뢰 홉이라고 가정하고, 클라이언트가 보낸 값은 위조
/// 방지를 위해 덮어씁니다.
fn set_forwarded_headers<B>(req: &mut Request<B>, client_addr: SocketAddr) {
    let host = req.headers().get(header::HOST).cloned();
    let headers = req.headers_mut();

    if let Ok(value) = HeaderValue::from_str(&client_addr.ip().to_string()) {
        headers.insert("x-forwarded-for", value);
    }

    if let Some(host) = host {
        headers.insert("x-forwarded-host", host);
    }

    headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));
}
