use std::fmt;

use bytes::Bytes;
use http_body_util::Full;
use hyper::StatusCode;
use tracing::error;

use super::Response;

#[derive(Debug)]
pub enum MiddlewareError {
    /// 레지스트리에 없는 규칙 이름
    UnknownRule { kind: String },
    /// 규칙 인자 파싱 실패
    InvalidArgs { kind: String, reason: String },
    /// 미들웨어가 요청을 변환하다 실패
    InvalidRequest(String),
    /// Rate limit 초과. 클라이언트에 돌려줄 응답을 담습니다.
    TooManyRequests(Response),
}

impl fmt::Display for MiddlewareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRule { kind } => {
                write!(f, "등록되지 않은 규칙: {}", kind)
            }
            Self::InvalidArgs { kind, reason } => {
                write!(f, "규칙 {} 인자 오류: {}", kind, reason)
            }
            Self::InvalidRequest(message) => {
                write!(f, "요청 오류: {}", message)
            }
            Self::TooManyRequests(_) => {
                write!(f, "rate limit exceeded")
            }
        }
    }
}

impl std::error::Error for MiddlewareError {}

/// 미들웨어 에러를 클라이언트 응답으로 변환합니다.
///
/// 응답을 담은 에러는 그대로 돌려주고, 나머지는 500으로 처리합니다.
/// 체인 일부만 적용된 채로 프록시하지 않습니다.
pub fn handle_middleware_error(error: MiddlewareError) -> Response {
    match error {
        MiddlewareError::TooManyRequests(response) => response,
        error => {
            error!(error = %error, "미들웨어 처리 실패");
            hyper::Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::from("internal server error")))
                .unwrap_or_else(|_| {
                    hyper::Response::new(Full::new(Bytes::from("internal server error")))
                })
        }
    }
}
