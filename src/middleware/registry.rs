use std::collections::HashMap;
use std::sync::Arc;

use crate::core::data::{ConfigDoc, Endpoint, Rule};

use super::{Middleware, MiddlewareCache, MiddlewareChain, MiddlewareError};

/// 규칙의 인자 블롭을 미들웨어 인스턴스로 파싱하는 빌더입니다.
pub type BuilderFunc = fn(&serde_json::Value) -> Result<Arc<dyn Middleware>, MiddlewareError>;

/// 레지스트리에 빌더를 등록하는 함수. 서버 옵션의 `rules` 목록으로 전달됩니다.
pub type RegisterFunc = fn(&mut RuleRegistry);

/// 규칙 타입 이름 → 빌더 매핑입니다.
#[derive(Default)]
pub struct RuleRegistry {
    builders: HashMap<String, BuilderFunc>,
}

impl RuleRegistry {
    pub fn new(registers: &[RegisterFunc]) -> Self {
        let mut registry = Self {
            builders: HashMap::new(),
        };
        for register in registers {
            register(&mut registry);
        }
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, builder: BuilderFunc) {
        self.builders.insert(kind.into(), builder);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.builders.contains_key(kind)
    }

    /// 규칙 하나를 미들웨어로 만듭니다.
    pub fn build(&self, rule: &Rule) -> Result<Arc<dyn Middleware>, MiddlewareError> {
        let builder = self
            .builders
            .get(&rule.kind)
            .ok_or_else(|| MiddlewareError::UnknownRule {
                kind: rule.kind.clone(),
            })?;
        builder(&rule.args)
    }

    /// 엔드포인트의 규칙들을 순서대로 체인으로 조립합니다.
    ///
    /// cachable 미들웨어는 캐시를 거쳐 기존 상태를 이어받고, 나머지는
    /// 요청마다 새로 만들어집니다. 중간에 실패하면 체인 전체가 실패합니다.
    pub fn build_chain(
        &self,
        endpoint: &Endpoint,
        cache: &MiddlewareCache,
    ) -> Result<MiddlewareChain, MiddlewareError> {
        let mut middlewares = Vec::with_capacity(endpoint.rules.len());

        for rule in &endpoint.rules {
            let mut middleware = self.build(rule)?;
            if middleware.is_cachable() {
                middleware = cache.get_and_update(&endpoint.hash_key(), middleware);
            }
            middlewares.push(middleware);
        }

        Ok(MiddlewareChain::new(middlewares))
    }

    /// 설정 문서의 규칙 이름을 전부 검증합니다.
    ///
    /// 모르는 규칙이 하나라도 있으면 문서 전체를 거부합니다. 일부만
    /// 설치하는 일은 없습니다.
    pub fn validate(&self, doc: &ConfigDoc) -> Result<(), MiddlewareError> {
        for endpoint in &doc.endpoints {
            for rule in &endpoint.rules {
                if !self.contains(&rule.kind) {
                    return Err(MiddlewareError::UnknownRule {
                        kind: rule.kind.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
