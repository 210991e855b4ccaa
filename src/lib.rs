//! Baker는 컨테이너 런타임에서 백엔드를 동적으로 발견하는 리버스 프록시입니다.
//!
//! # 주요 기능
//!
//! - 컨테이너가 자기 라우팅 의도를 설정 엔드포인트로 직접 설명
//! - (도메인, 경로) 최장 접두사 매칭과 무작위 백엔드 선택
//! - 단일 작성자 커맨드 큐로 직렬화되는 라우팅 상태
//! - 엔드포인트 단위 미들웨어 체인 (rate limit, 경로 재작성)
//! - 주기적 핑으로 죽은 컨테이너 정리
//!
//! # 예제
//!
//! ```
//! use baker::core::{RoutingTable, Container, Endpoint, StaticHints};
//! use baker::middleware::MiddlewareCache;
//!
//! let mut table = RoutingTable::new();
//! let cache = MiddlewareCache::new();
//!
//! let container = Container {
//!     id: "c1".to_string(),
//!     config_path: "/config".to_string(),
//!     addr: Some("127.0.0.1:8080".parse().unwrap()),
//!     hints: StaticHints::default(),
//! };
//!
//! table.add(container.clone());
//! table.update(
//!     container,
//!     Endpoint {
//!         domain: "example.com".to_string(),
//!         path: "/api".to_string(),
//!         rules: Vec::new(),
//!     },
//!     &cache,
//! );
//!
//! // 최장 접두사 매칭
//! let (resolved, _) = table.resolve("example.com", "/api/v1/items").unwrap();
//! assert_eq!(resolved.id, "c1");
//! ```

pub mod config;
pub mod core;
pub mod docker;
pub mod entrylist;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod proxy;
pub mod server;
pub mod trie;
