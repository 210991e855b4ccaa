//! 주기적인 헬스/설정 갱신 사이클입니다.
//!
//! Pinger 커맨드가 워커에서 스냅샷을 뜨고, 자기 경로를 스스로 설명하는
//! 컨테이너들의 설정 엔드포인트를 독립 태스크로 가져옵니다. 태스크는
//! 워커를 막지 않고, 결과를 일반 커맨드(Update / PingOk / PingMiss)로
//! 되돌려 보냅니다.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use crate::core::data::{ConfigDoc, Container, Endpoint};
use crate::core::runner::ActionRunner;
use crate::middleware::RuleRegistry;

/// 설정 문서 조회 제한 시간. 티커 주기와 무관하게 개별 조회에 걸립니다.
const FETCH_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) struct PingCycle {
    client: legacy::Client<HttpConnector, Empty<Bytes>>,
    registry: Arc<RuleRegistry>,
}

impl PingCycle {
    pub(crate) fn new(registry: Arc<RuleRegistry>) -> Self {
        let client = legacy::Client::builder(TokioExecutor::new())
            .build::<_, Empty<Bytes>>(HttpConnector::new());

        Self { client, registry }
    }

    /// 스냅샷을 선언 경로 / 자기 설명 컨테이너로 나누어 처리합니다.
    pub(crate) fn run(&self, snapshot: Vec<Container>, runner: &Arc<ActionRunner>) {
        for container in snapshot {
            // 정적 도메인이 선언된 컨테이너는 핑하지 않습니다
            if container.hints.has_declared_route() {
                let endpoint = Endpoint {
                    domain: container.hints.domain.clone(),
                    path: container.hints.path.clone(),
                    rules: Vec::new(),
                };
                runner.update(container, endpoint);
                continue;
            }

            let Some(addr) = container.addr else {
                debug!(container_id = %container.id, "주소가 아직 없는 컨테이너, 핑 실패로 기록");
                runner.ping_miss(&container.id);
                continue;
            };

            let client = self.client.clone();
            let registry = Arc::clone(&self.registry);
            let runner = Arc::clone(runner);

            tokio::spawn(async move {
                match fetch_config(&client, addr, &container.config_path).await {
                    Ok(doc) => {
                        // 모르는 규칙이 있으면 문서 전체를 거부합니다
                        if let Err(error) = registry.validate(&doc) {
                            warn!(
                                container_id = %container.id,
                                error = %error,
                                "설정 문서 거부"
                            );
                            runner.ping_miss(&container.id);
                            return;
                        }

                        for endpoint in doc.endpoints {
                            runner.update(container.clone(), endpoint);
                        }
                        runner.ping_ok(&container.id);
                    }
                    Err(error) => {
                        warn!(
                            container_id = %container.id,
                            addr = %addr,
                            error = %error,
                            "설정 엔드포인트 호출 실패"
                        );
                        runner.ping_miss(&container.id);
                    }
                }
            });
        }
    }
}

#[derive(Debug)]
enum PingError {
    Transport(String),
    Status(u16),
    Decode(String),
}

impl fmt::Display for PingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(reason) => write!(f, "전송 실패: {}", reason),
            Self::Status(code) => write!(f, "상태 코드 {}", code),
            Self::Decode(reason) => write!(f, "디코딩 실패: {}", reason),
        }
    }
}

async fn fetch_config(
    client: &legacy::Client<HttpConnector, Empty<Bytes>>,
    addr: SocketAddr,
    config_path: &str,
) -> Result<ConfigDoc, PingError> {
    let uri: Uri = format!("http://{}{}", addr, config_path)
        .parse()
        .map_err(|e: hyper::http::uri::InvalidUri| PingError::Transport(e.to_string()))?;

    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Empty::new())
        .map_err(|e| PingError::Transport(e.to_string()))?;

    let response = tokio::time::timeout(FETCH_TIMEOUT, client.request(request))
        .await
        .map_err(|_| PingError::Transport("시간 초과".to_string()))?
        .map_err(|e| PingError::Transport(e.to_string()))?;

    if !response.status().is_success() {
        return Err(PingError::Status(response.status().as_u16()));
    }

    let body = tokio::time::timeout(FETCH_TIMEOUT, response.into_body().collect())
        .await
        .map_err(|_| PingError::Transport("시간 초과".to_string()))?
        .map_err(|e| PingError::Transport(e.to_string()))?
        .to_bytes();

    serde_json::from_slice(&body).map_err(|e| PingError::Decode(e.to_string()))
}
