//! 매칭된 컨테이너로 요청을 전달하는 리버스 프록시입니다.
//!
//! 일반 요청은 커넥션 풀을 가진 클라이언트로 전달하고, WebSocket
//! 업그레이드 요청은 백엔드와 원시 핸드셰이크를 맺은 뒤 양방향으로
//! 바이트를 복사합니다.

use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{self, HeaderValue};
use hyper::upgrade::Upgraded;
use hyper::{Request, Response, StatusCode, Uri};
use hyper_util::client::legacy;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

// 프록시 클라이언트. 커넥션 재사용을 위해 핸들러 수명 동안 공유됩니다.
#[derive(Clone)]
pub struct ProxyClient {
    client: legacy::Client<HttpConnector, Incoming>,
}

impl ProxyClient {
    pub fn new() -> Self {
        let connector = HttpConnector::new();
        let client = legacy::Client::builder(TokioExecutor::new())
            .build::<_, Incoming>(connector);

        Self { client }
    }

    /// 요청을 `http://<addr><경로>`로 다시 써서 전달하고, 응답 본문을
    /// 모아서 돌려줍니다.
    pub async fn proxy_request(
        &self,
        addr: SocketAddr,
        req: Request<Incoming>,
    ) -> Response<Full<Bytes>> {
        let proxied = match build_proxied_request(addr, req) {
            Ok(proxied) => proxied,
            Err(e) => {
                return build_error_response(
                    StatusCode::BAD_REQUEST,
                    format!("요청 변환 실패: {}", e),
                );
            }
        };

        match self.client.request(proxied).await {
            Ok(res) => {
                let (parts, body) = res.into_parts();
                match body.collect().await {
                    Ok(collected) => Response::from_parts(parts, Full::new(collected.to_bytes())),
                    Err(e) => build_error_response(
                        StatusCode::BAD_GATEWAY,
                        format!("응답 본문 수신 실패: {}", e),
                    ),
                }
            }
            Err(e) => build_error_response(
                StatusCode::BAD_GATEWAY,
                format!("백엔드 요청 실패: {}", e),
            ),
        }
    }

    /// WebSocket 업그레이드 요청을 백엔드로 중계합니다.
    ///
    /// 백엔드에 원시 핸드셰이크를 보내고, 101이 오면 클라이언트 쪽
    /// 업그레이드 완료 후 양방향 복사 태스크를 띄웁니다.
    pub async fn proxy_upgrade(
        &self,
        addr: SocketAddr,
        req: Request<Incoming>,
        request_id: &str,
    ) -> Response<Full<Bytes>> {
        let raw_request = build_upgrade_request(&req, addr);

        let mut backend = match TcpStream::connect(addr).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(addr = %addr, error = %e, "업그레이드용 백엔드 연결 실패");
                return build_error_response(StatusCode::BAD_GATEWAY, "백엔드 연결 실패".to_string());
            }
        };

        if let Err(e) = backend.write_all(&raw_request).await {
            error!(addr = %addr, error = %e, "업그레이드 요청 전송 실패");
            return build_error_response(StatusCode::BAD_GATEWAY, "백엔드 연결 실패".to_string());
        }

        let mut buf = vec![0u8; 4096];
        let n = match backend.read(&mut buf).await {
            Ok(n) if n > 0 => n,
            Ok(_) => {
                error!(addr = %addr, "백엔드가 업그레이드 응답 전에 연결을 닫음");
                return build_error_response(StatusCode::BAD_GATEWAY, "백엔드 연결 종료".to_string());
            }
            Err(e) => {
                error!(addr = %addr, error = %e, "업그레이드 응답 수신 실패");
                return build_error_response(StatusCode::BAD_GATEWAY, "백엔드 응답 수신 실패".to_string());
            }
        };

        let Some((status, headers)) = parse_upgrade_response(&buf[..n]) else {
            error!(addr = %addr, "업그레이드 응답 파싱 실패");
            return build_error_response(StatusCode::BAD_GATEWAY, "잘못된 업그레이드 응답".to_string());
        };

        // 백엔드가 업그레이드를 거절하면 그 응답을 그대로 돌려줍니다
        if status != StatusCode::SWITCHING_PROTOCOLS {
            warn!(addr = %addr, status = %status, "백엔드가 업그레이드를 거절");
            return build_raw_response(status, &headers);
        }

        info!(request_id, addr = %addr, "WebSocket 업그레이드 성공");

        let response = build_raw_response(status, &headers);

        let request_id = request_id.to_string();
        tokio::spawn(async move {
            match hyper::upgrade::on(req).await {
                Ok(upgraded) => {
                    forward_bidirectional(upgraded, backend, &request_id).await;
                }
                Err(e) => {
                    error!(request_id = %request_id, error = %e, "클라이언트 업그레이드 실패");
                }
            }
        });

        response
    }
}

impl Default for ProxyClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection: upgrade 와 Upgrade 헤더가 모두 있는 요청인지 확인합니다.
pub fn is_upgrade_request<B>(req: &Request<B>) -> bool {
    let has_upgrade_connection = req
        .headers()
        .get(header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_lowercase().contains("upgrade"))
        .unwrap_or(false);

    has_upgrade_connection && req.headers().contains_key(header::UPGRADE)
}

fn build_proxied_request(
    addr: SocketAddr,
    mut req: Request<Incoming>,
) -> Result<Request<Incoming>, hyper::http::Error> {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let uri: Uri = format!("http://{}{}", addr, path_and_query).parse()?;

    debug!(from = %req.uri(), to = %uri, "요청 URI 재작성");

    // Host는 클라이언트가 대상 주소로 다시 채우도록 비웁니다.
    // 원래 호스트는 X-Forwarded-Host로 전달됩니다.
    req.headers_mut().remove(header::HOST);
    *req.uri_mut() = uri;

    Ok(req)
}

/// 백엔드로 보낼 원시 업그레이드 핸드셰이크를 만듭니다.
fn build_upgrade_request<B>(req: &Request<B>, addr: SocketAddr) -> Vec<u8> {
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let mut raw = format!("{} {} HTTP/1.1\r\n", req.method(), path);

    for (name, value) in req.headers() {
        if name == &header::HOST {
            continue;
        }
        if let Ok(value) = value.to_str() {
            raw.push_str(&format!("{}: {}\r\n", name, value));
        }
    }

    raw.push_str(&format!("Host: {}\r\n", addr));
    raw.push_str("\r\n");

    raw.into_bytes()
}

/// 백엔드의 상태줄과 헤더를 파싱합니다. 101 여부 판단에 씁니다.
fn parse_upgrade_response(data: &[u8]) -> Option<(StatusCode, Vec<(String, String)>)> {
    let text = std::str::from_utf8(data).ok()?;
    let mut lines = text.lines();

    let status_line = lines.next()?;
    let code = status_line.split(' ').nth(1)?;
    let status = StatusCode::from_u16(code.parse().ok()?).ok()?;

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    Some((status, headers))
}

fn build_raw_response(status: StatusCode, headers: &[(String, String)]) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);

    for (name, value) in headers {
        // 본문 관련 헤더는 hyper가 관리하므로 건너뜁니다
        let lower = name.to_lowercase();
        if lower == "content-length" || lower == "transfer-encoding" {
            continue;
        }
        if let Ok(value) = HeaderValue::from_str(value) {
            builder = builder.header(name.as_str(), value);
        }
    }

    builder
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

async fn forward_bidirectional(client: Upgraded, mut backend: TcpStream, request_id: &str) {
    let mut client_io = TokioIo::new(client);

    match tokio::io::copy_bidirectional(&mut client_io, &mut backend).await {
        Ok((to_backend, to_client)) => {
            debug!(request_id, to_backend, to_client, "WebSocket 연결 정상 종료");
        }
        Err(e) => {
            debug!(request_id, error = %e, "WebSocket 연결 종료");
        }
    }
}

pub(crate) fn build_error_response(status: StatusCode, message: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(message)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("internal server error"))))
}
