//! 액션 러너의 순서 보장, 큐 포화, 종료 동작을 서버 공개 API로 검증합니다.

use std::sync::Arc;
use std::time::Duration;

use baker::core::{Container, Driver, Endpoint, StaticHints};
use baker::server::{Server, ServerOptions};

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

fn spawn_server(options: ServerOptions) -> (Server, Arc<dyn Driver>) {
    let server = Server::new(options);
    let mut captured = None;
    server.register_driver(|driver| captured = Some(driver));
    (server, captured.unwrap())
}

#[tokio::test]
async fn test_commands_processed_in_submission_order() {
    let (server, driver) = spawn_server(ServerOptions::default());

    driver.add(container("c1"));
    driver.update(container("c1"), endpoint("example.com", "/a"));

    // 같은 호출자의 커맨드는 제출 순서대로 처리됩니다
    let resolved = driver.get("example.com", "/a").await;
    assert_eq!(resolved.unwrap().0.id, "c1");

    server.close();
}

#[tokio::test]
async fn test_get_returns_none_for_unknown_route() {
    let (server, driver) = spawn_server(ServerOptions::default());

    assert!(driver.get("example.com", "/nope").await.is_none());

    server.close();
}

#[tokio::test]
async fn test_get_after_close_returns_none() {
    let (server, driver) = spawn_server(ServerOptions::default());

    driver.add(container("c1"));
    driver.update(container("c1"), endpoint("example.com", "/a"));
    assert!(driver.get("example.com", "/a").await.is_some());

    server.close();

    // 닫힌 뒤의 Get은 "no match"로 풀려나야 합니다
    assert!(driver.get("example.com", "/a").await.is_none());

    // 닫힌 뒤의 push는 조용히 버려집니다
    driver.add(container("c2"));
    driver.remove(container("c1"));
}

#[tokio::test]
async fn test_queue_full_burst_does_not_deadlock() {
    let (server, driver) = spawn_server(ServerOptions::default().with_buffer_size(4));

    // 큐 용량의 10배를 몰아넣어도 어떤 호출도 막히지 않아야 합니다
    for i in 0..40 {
        driver.add(container(&format!("burst-{}", i)));
    }

    let result = tokio::time::timeout(Duration::from_secs(5), async {
        // 버려진 커맨드가 있어도 이후 커맨드는 정상 처리됩니다.
        // 큐가 비워질 때까지 짧게 재시도합니다.
        for _ in 0..50 {
            driver.add(container("late"));
            driver.update(container("late"), endpoint("example.com", "/late"));
            if driver.get("example.com", "/late").await.is_some() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    })
    .await;

    assert!(result.unwrap(), "큐 포화 이후에도 커맨드가 처리되어야 함");

    server.close();
}

#[tokio::test]
async fn test_remove_unknown_container_is_noop() {
    let (server, driver) = spawn_server(ServerOptions::default());

    driver.remove(container("ghost"));

    driver.add(container("c1"));
    driver.update(container("c1"), endpoint("example.com", "/a"));
    assert!(driver.get("example.com", "/a").await.is_some());

    server.close();
}
