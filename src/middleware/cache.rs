use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::Middleware;

/// 엔드포인트 해시 키 → 미들웨어 인스턴스 캐시입니다.
///
/// 미들웨어가 요청 사이에 유지해야 하는 상태(대표적으로 클라이언트 IP별
/// 토큰 버킷) 때문에 존재합니다. `get_and_update`는 요청 경로에서 불리므로
/// 자체적으로 원자성을 보장하고, 삭제는 라우팅 테이블이 엔드포인트의
/// 마지막 컨테이너를 정리할 때만 일어납니다.
#[derive(Clone, Default)]
pub struct MiddlewareCache {
    entries: Arc<Mutex<HashMap<String, Arc<dyn Middleware>>>>,
}

impl MiddlewareCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 키의 기존 인스턴스에 갱신을 위임하고, 결과를 다시 캐시합니다.
    ///
    /// 처음 보는 키면 `fresh.update(None)`, 이미 있으면
    /// `prev.update(Some(fresh))`가 불립니다.
    pub fn get_and_update(
        &self,
        key: &str,
        fresh: Arc<dyn Middleware>,
    ) -> Arc<dyn Middleware> {
        let mut entries = self.entries.lock().unwrap();

        let updated = match entries.get(key) {
            Some(prev) => Arc::clone(prev).update(Some(fresh)),
            None => fresh.update(None),
        };

        entries.insert(key.to_string(), Arc::clone(&updated));
        updated
    }

    pub fn delete(&self, key: &str) {
        if self.entries.lock().unwrap().remove(key).is_some() {
            debug!(key, "미들웨어 캐시 엔트리 삭제");
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
