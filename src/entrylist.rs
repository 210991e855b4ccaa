//! 백엔드가 자기 설정 문서를 만들 때 쓰는 빌더입니다.
//!
//! 프록시가 폴링하는 `{"endpoints": [...]}` 문서의 모양은 안정적인
//! 계약이고, 이 빌더는 그 모양을 강제합니다.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header;

use crate::core::data::{ConfigDoc, Endpoint, Rule};

#[derive(Default)]
pub struct EntryList {
    entries: Vec<Endpoint>,
    cached: Option<Bytes>,
}

impl EntryList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 엔트리를 추가합니다. `ready`가 false면 아무것도 하지 않으므로
    /// 준비 조건을 호출부에서 인라인으로 쓸 수 있습니다.
    pub fn entry(mut self, domain: &str, path: &str, ready: bool) -> Self {
        if !ready {
            return self;
        }

        self.entries.push(Endpoint {
            domain: domain.to_string(),
            path: path.to_string(),
            rules: Vec::new(),
        });

        self
    }

    /// 마지막으로 추가한 엔트리에 규칙을 붙입니다.
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        if let Some(last) = self.entries.last_mut() {
            last.rules = rules;
        }
        self
    }

    /// 응답을 미리 직렬화해 둡니다. 이후의 `to_bytes`는 캐시를 돌려줍니다.
    pub fn cache_response(mut self) -> Self {
        self.cached = Some(self.serialize());
        self
    }

    pub fn to_bytes(&self) -> Bytes {
        match &self.cached {
            Some(cached) => cached.clone(),
            None => self.serialize(),
        }
    }

    pub fn write_response(&self) -> hyper::Response<Full<Bytes>> {
        hyper::Response::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(self.to_bytes()))
            .unwrap_or_else(|_| hyper::Response::new(Full::new(Bytes::new())))
    }

    fn serialize(&self) -> Bytes {
        let doc = ConfigDoc {
            endpoints: self.entries.clone(),
        };
        Bytes::from(serde_json::to_vec(&doc).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::data::ConfigDoc;
    use crate::middleware::rate_limit;

    #[test]
    fn test_empty_list() {
        let payload = EntryList::new().to_bytes();
        let doc: ConfigDoc = serde_json::from_slice(&payload).unwrap();
        assert!(doc.endpoints.is_empty());
    }

    #[test]
    fn test_entry_respects_ready_flag() {
        let payload = EntryList::new()
            .entry("example.com", "/a", true)
            .entry("example.com", "/b", false)
            .to_bytes();

        let doc: ConfigDoc = serde_json::from_slice(&payload).unwrap();
        assert_eq!(doc.endpoints.len(), 1);
        assert_eq!(doc.endpoints[0].path, "/a");
    }

    #[test]
    fn test_rules_attach_to_last_entry() {
        let payload = EntryList::new()
            .entry("example.com", "/a", true)
            .with_rules(vec![rate_limit::rule(2, Duration::from_secs(3))])
            .to_bytes();

        let doc: ConfigDoc = serde_json::from_slice(&payload).unwrap();
        assert_eq!(doc.endpoints[0].rules.len(), 1);
        assert_eq!(doc.endpoints[0].rules[0].kind, "RateLimiter");
    }

    #[test]
    fn test_write_response_sets_content_type() {
        let response = EntryList::new()
            .entry("example.com", "/a", true)
            .write_response();

        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_cached_response_matches() {
        let list = EntryList::new().entry("example.com", "/a", true);
        let fresh = list.to_bytes();

        let cached = EntryList::new()
            .entry("example.com", "/a", true)
            .cache_response()
            .to_bytes();

        assert_eq!(fresh, cached);
    }
}
