//! (domain → 경로 트라이 → Service) 라우팅 상태입니다.
//!
//! 이 구조체는 자체 잠금을 갖지 않습니다. 쓰기는 전부 액션 러너의 단일
//! 워커에서 일어나고, 읽기(resolve) 역시 Get 커맨드로 직렬화됩니다.

use std::collections::HashMap;

use rand::Rng;
use tracing::{debug, warn};

use crate::core::data::{Container, Endpoint, Service};
use crate::middleware::MiddlewareCache;
use crate::trie::Trie;

/// 컨테이너가 현재 트라이 어디에 설치되어 있는지 기록합니다.
/// `domain`/`path`는 첫 Update 성공 전까지 비어 있으며, 이후 Remove가
/// O(1)로 서비스 위치를 찾는 데 쓰입니다.
struct ContainerInfo {
    container: Container,
    domain: String,
    path: String,
    ping_misses: u32,
}

/// 핑 실패 허용 횟수. 이 횟수를 넘기면 컨테이너를 제거합니다.
const MAX_PING_MISSES: u32 = 3;

pub struct RoutingTable {
    containers: HashMap<String, ContainerInfo>,
    domains: HashMap<String, Trie<Service>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            containers: HashMap::new(),
            domains: HashMap::new(),
        }
    }

    /// 컨테이너의 존재만 기록합니다. 트라이는 건드리지 않습니다.
    pub fn add(&mut self, container: Container) {
        if self.containers.contains_key(&container.id) {
            warn!(container_id = %container.id, "이미 등록된 컨테이너, 무시합니다");
            return;
        }

        self.containers.insert(
            container.id.clone(),
            ContainerInfo {
                container,
                domain: String::new(),
                path: String::new(),
                ping_misses: 0,
            },
        );
    }

    /// 컨테이너를 대상 엔드포인트로 이동시킵니다.
    ///
    /// Add가 선행되지 않은 Update는 버립니다. 늦게 도착한 Update가 이미
    /// 제거된 컨테이너를 되살리는 경쟁을 막기 위한 정책입니다.
    pub fn update(&mut self, container: Container, endpoint: Endpoint, cache: &MiddlewareCache) {
        let Some(info) = self.containers.get(&container.id) else {
            debug!(container_id = %container.id, "등록되지 않은 컨테이너의 Update, 버립니다");
            return;
        };

        if info.domain == endpoint.domain && info.path == endpoint.path {
            return;
        }

        if !info.domain.is_empty() {
            let (domain, path) = (info.domain.clone(), info.path.clone());
            self.detach(&container.id, &domain, &path, cache);
        }

        let trie = self
            .domains
            .entry(endpoint.domain.clone())
            .or_insert_with(Trie::new);

        match trie.get_exact_mut(&endpoint.path) {
            Some(service) => {
                service.containers.push(container.clone());
                // rules는 엔드포인트 단위이므로 가장 최근 Update의 값이 이깁니다.
                service.endpoint = endpoint.clone();
            }
            None => {
                trie.put(
                    &endpoint.path,
                    Service {
                        endpoint: endpoint.clone(),
                        containers: vec![container.clone()],
                    },
                );
            }
        }

        debug!(
            container_id = %container.id,
            domain = %endpoint.domain,
            path = %endpoint.path,
            "컨테이너 위치 갱신"
        );

        if let Some(info) = self.containers.get_mut(&container.id) {
            info.domain = endpoint.domain;
            info.path = endpoint.path;
        }
    }

    /// 컨테이너를 테이블에서 제거하고, 설치 위치의 서비스에서 떼어냅니다.
    pub fn remove(&mut self, container: &Container, cache: &MiddlewareCache) {
        let Some(info) = self.containers.remove(&container.id) else {
            return;
        };

        debug!(container_id = %container.id, "컨테이너 제거");

        if !info.domain.is_empty() {
            self.detach(&container.id, &info.domain, &info.path, cache);
        }
    }

    /// 최장 접두사 매칭으로 서비스를 찾고, 컨테이너 하나를 균등 확률로 고릅니다.
    pub fn resolve(&self, domain: &str, path: &str) -> Option<(Container, Endpoint)> {
        let trie = self.domains.get(domain)?;
        let service = trie.get(path)?;
        if service.containers.is_empty() {
            return None;
        }

        let pos = rand::thread_rng().gen_range(0..service.containers.len());
        Some((service.containers[pos].clone(), service.endpoint.clone()))
    }

    /// 핑 사이클이 쓰는 스냅샷. Pinger 커맨드 안에서 호출되므로
    /// 라우팅 상태와 일관성이 보장됩니다.
    pub fn snapshot(&self) -> Vec<Container> {
        self.containers
            .values()
            .map(|info| info.container.clone())
            .collect()
    }

    /// 핑 성공 시 실패 횟수를 초기화합니다.
    pub fn reset_misses(&mut self, id: &str) {
        if let Some(info) = self.containers.get_mut(id) {
            info.ping_misses = 0;
        }
    }

    /// 핑 실패를 기록하고, 허용 횟수를 넘긴 컨테이너를 반환합니다.
    pub fn record_miss(&mut self, id: &str) -> Option<Container> {
        let info = self.containers.get_mut(id)?;
        info.ping_misses += 1;
        if info.ping_misses > MAX_PING_MISSES {
            Some(info.container.clone())
        } else {
            None
        }
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// 서비스에서 컨테이너를 떼어내고, 서비스가 비면 트라이 경로와
    /// 해당 엔드포인트의 미들웨어 캐시 엔트리를 함께 지웁니다.
    fn detach(&mut self, id: &str, domain: &str, path: &str, cache: &MiddlewareCache) {
        let Some(trie) = self.domains.get_mut(domain) else {
            return;
        };
        let Some(service) = trie.get_exact_mut(path) else {
            return;
        };

        service.containers.retain(|c| c.id != id);

        if service.containers.is_empty() {
            if let Some(service) = trie.del(path) {
                cache.delete(&service.endpoint.hash_key());
            }
            if trie.is_empty() {
                self.domains.remove(domain);
            }
        }
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}
