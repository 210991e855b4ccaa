//! 엔드포인트 단위 요청 미들웨어 프레임워크입니다.
//!
//! 규칙 레지스트리가 규칙 이름으로 미들웨어를 만들고, 상태를 가진
//! (cachable) 미들웨어는 엔드포인트 키로 캐시되어 요청 사이에 살아남습니다.

mod cache;
mod chain;
mod error;
mod registry;
mod traits;

pub mod path;
pub mod rate_limit;

pub use cache::MiddlewareCache;
pub use chain::MiddlewareChain;
pub use error::{handle_middleware_error, MiddlewareError};
pub use registry::{BuilderFunc, RegisterFunc, RuleRegistry};
pub use traits::Middleware;

// 재사용 가능한 타입 별칭
pub type Request = hyper::Request<hyper::body::Incoming>;
pub type Response = hyper::Response<http_body_util::Full<bytes::Bytes>>;
