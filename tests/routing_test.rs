use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use baker::core::{Container, Endpoint, RoutingTable, StaticHints};
use baker::middleware::rate_limit::{RateLimitConfig, RateLimitMiddleware};
use baker::middleware::{Middleware, MiddlewareCache};

fn container(id: &str) -> Container {
    Container {
        id: id.to_string(),
        config_path: "/config".to_string(),
        addr: Some("127.0.0.1:8080".parse().unwrap()),
        hints: StaticHints::default(),
    }
}

fn endpoint(domain: &str, path: &str) -> Endpoint {
    Endpoint {
        domain: domain.to_string(),
        path: path.to_string(),
        rules: Vec::new(),
    }
}

#[test]
fn test_update_requires_add() {
    let mut table = RoutingTable::new();
    let cache = MiddlewareCache::new();

    table.update(container("c1"), endpoint("example.com", "/a"), &cache);

    assert!(table.resolve("example.com", "/a").is_none());
    assert_eq!(table.container_count(), 0);
}

#[test]
fn test_update_idempotent() {
    let mut table = RoutingTable::new();
    let cache = MiddlewareCache::new();

    table.add(container("c1"));
    for _ in 0..5 {
        table.update(container("c1"), endpoint("example.com", "/a"), &cache);
    }

    let (resolved, _) = table.resolve("example.com", "/a").unwrap();
    assert_eq!(resolved.id, "c1");
    assert_eq!(table.container_count(), 1);
}

#[test]
fn test_last_update_wins() {
    let mut table = RoutingTable::new();
    let cache = MiddlewareCache::new();

    table.add(container("c1"));
    table.update(container("c1"), endpoint("example.com", "/a"), &cache);
    table.update(container("c1"), endpoint("example.com", "/b"), &cache);

    // 마지막 Update만 적용한 것과 동일한 상태여야 합니다
    assert!(table.resolve("example.com", "/a").is_none());
    let (resolved, _) = table.resolve("example.com", "/b").unwrap();
    assert_eq!(resolved.id, "c1");
}

#[test]
fn test_at_most_once_id() {
    let mut table = RoutingTable::new();
    let cache = MiddlewareCache::new();

    table.add(container("c1"));
    table.add(container("c1"));
    table.update(container("c1"), endpoint("example.com", "/a"), &cache);

    assert_eq!(table.container_count(), 1);

    // 어느 시점에도 컨테이너는 한 서비스에만 속합니다
    for _ in 0..50 {
        let (resolved, _) = table.resolve("example.com", "/a").unwrap();
        assert_eq!(resolved.id, "c1");
    }
}

#[test]
fn test_longest_prefix_resolution() {
    let mut table = RoutingTable::new();
    let cache = MiddlewareCache::new();

    table.add(container("c1"));
    table.add(container("c2"));
    table.update(container("c1"), endpoint("example.com", "/a"), &cache);
    table.update(container("c2"), endpoint("example.com", "/a/b"), &cache);

    let (resolved, _) = table.resolve("example.com", "/a/b/c").unwrap();
    assert_eq!(resolved.id, "c2");

    let (resolved, _) = table.resolve("example.com", "/a/x").unwrap();
    assert_eq!(resolved.id, "c1");

    assert!(table.resolve("example.com", "/z").is_none());
    assert!(table.resolve("other.com", "/a").is_none());
}

#[test]
fn test_remove_cleans_trie_and_cache() {
    let mut table = RoutingTable::new();
    let cache = MiddlewareCache::new();

    let ep = endpoint("example.com", "/a");

    table.add(container("c1"));
    table.update(container("c1"), ep.clone(), &cache);

    // 엔드포인트에 묶인 캐시 엔트리를 흉내냅니다
    let middleware: Arc<dyn Middleware> = Arc::new(RateLimitMiddleware::new(RateLimitConfig {
        request_limit: 2,
        window_duration: Duration::from_secs(3),
    }));
    cache.get_and_update(&ep.hash_key(), middleware);
    assert!(cache.contains(&ep.hash_key()));

    table.remove(&container("c1"), &cache);

    assert!(table.resolve("example.com", "/a").is_none());
    assert!(!cache.contains(&ep.hash_key()));
    assert_eq!(table.container_count(), 0);
}

#[test]
fn test_remove_keeps_remaining_containers() {
    let mut table = RoutingTable::new();
    let cache = MiddlewareCache::new();

    table.add(container("c1"));
    table.add(container("c2"));
    table.update(container("c1"), endpoint("example.com", "/api"), &cache);
    table.update(container("c2"), endpoint("example.com", "/api"), &cache);

    table.remove(&container("c1"), &cache);

    for _ in 0..50 {
        let (resolved, _) = table.resolve("example.com", "/api").unwrap();
        assert_eq!(resolved.id, "c2");
    }
}

#[test]
fn test_relocation_prunes_old_service() {
    let mut table = RoutingTable::new();
    let cache = MiddlewareCache::new();

    table.add(container("c1"));
    table.update(container("c1"), endpoint("a.com", "/x"), &cache);
    table.update(container("c1"), endpoint("b.com", "/y"), &cache);

    assert!(table.resolve("a.com", "/x").is_none());
    assert!(table.resolve("b.com", "/y").is_some());
}

#[test]
fn test_random_selection_is_roughly_uniform() {
    let mut table = RoutingTable::new();
    let cache = MiddlewareCache::new();

    let ids = ["c1", "c2", "c3"];
    for id in ids {
        table.add(container(id));
        table.update(container(id), endpoint("example.com", "/api"), &cache);
    }

    let total = 3000;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for _ in 0..total {
        let (resolved, _) = table.resolve("example.com", "/api").unwrap();
        *counts.entry(resolved.id).or_default() += 1;
    }

    for id in ids {
        let share = counts[id] as f64 / total as f64;
        assert!(
            (share - 1.0 / 3.0).abs() < 0.1,
            "{} 비율이 치우침: {}",
            id,
            share
        );
    }
}

#[test]
fn test_ping_miss_threshold() {
    let mut table = RoutingTable::new();
    let cache = MiddlewareCache::new();

    table.add(container("c1"));
    table.update(container("c1"), endpoint("example.com", "/a"), &cache);

    // 3번까지는 버티고
    for _ in 0..3 {
        assert!(table.record_miss("c1").is_none());
    }

    // 4번째에 제거 대상이 됩니다
    let evicted = table.record_miss("c1").unwrap();
    assert_eq!(evicted.id, "c1");

    // 성공하면 카운터가 초기화됩니다
    table.reset_misses("c1");
    assert!(table.record_miss("c1").is_none());
}
