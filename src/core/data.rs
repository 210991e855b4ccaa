//! 라우팅 코어가 다루는 데이터 모델과 드라이버 계약입니다.

use std::collections::HashMap;
use std::net::SocketAddr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 프록시에 등록된 백엔드 워크로드입니다. 식별자는 `id` 하나로 충분하며,
/// 같은 id에 대한 교체는 Remove 후 Add로 표현됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    /// 설정 문서를 제공하는 경로 (예: `/config`)
    pub config_path: String,
    /// 등록 직후 첫 헬스 확인 전까지는 비어 있을 수 있음
    pub addr: Option<SocketAddr>,
    pub hints: StaticHints,
}

/// 어댑터가 컨테이너 라벨에서 읽어오는 정적 힌트입니다.
///
/// `domain`이 비어 있지 않으면 경로가 선언된(declared) 컨테이너로 취급되어
/// HTTP 폴링 대상에서 제외됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticHints {
    pub domain: String,
    pub path: String,
    pub headers: HashMap<String, String>,
}

impl StaticHints {
    pub fn has_declared_route(&self) -> bool {
        !self.domain.is_empty()
    }
}

/// 클라이언트가 컨테이너에 도달하는 방법을 선언하는 (domain, path, rules) 튜플입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub domain: String,
    pub path: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Endpoint {
    /// 미들웨어 캐시 키. 도메인과 경로 사이에 예약 구분자를 넣어
    /// `example.co` + `m/a` 같은 별칭 충돌을 차단합니다.
    pub fn hash_key(&self) -> String {
        format!("{}\u{1}{}", self.domain, self.path)
    }
}

/// 규칙 레지스트리에서 빌더를 선택하는 이름과 불투명한 인자입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// 컨테이너의 설정 엔드포인트가 반환하는 문서입니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigDoc {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// 같은 (domain, path)를 광고하는 컨테이너들의 집합입니다.
/// `endpoint.rules`는 가장 최근 Update가 준 값을 따릅니다.
#[derive(Debug, Clone)]
pub struct Service {
    pub endpoint: Endpoint,
    pub containers: Vec<Container>,
}

/// 디스커버리 어댑터가 코어에 상태를 밀어 넣을 때 쓰는 계약입니다.
///
/// 구현체는 액션 러너 하나뿐이며, `Server::register_driver`를 통해
/// 어댑터에 주입됩니다. Remove에 넘어오는 컨테이너는 id만으로 식별됩니다.
#[async_trait]
pub trait Driver: Send + Sync {
    fn add(&self, container: Container);
    fn update(&self, container: Container, endpoint: Endpoint);
    fn remove(&self, container: Container);
    fn pinger(&self);
    async fn get(&self, domain: &str, path: &str) -> Option<(Container, Endpoint)>;
}
