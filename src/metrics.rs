//! Prometheus 메트릭 수집과 노출입니다.

use std::net::SocketAddr;
use std::time::Duration;

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

/// 요청 처리 시간 히스토그램 버킷 (초 단위)
const DURATION_BUCKETS: &[f64] = &[0.1, 0.3, 1.0, 1.5, 2.0, 5.0, 10.0];

/// 레코더를 설치하고 스크레이프 리스너를 띄웁니다.
pub fn init(addr: SocketAddr) {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full("request_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .expect("히스토그램 버킷 설정 실패")
        .install()
        .expect("Prometheus 레코더 설치 실패");

    tracing::info!(addr = %addr, "메트릭 서버 시작");
}

/// 버전과 커밋 해시를 info 게이지로 기록합니다.
pub fn set_info(version: &str, commit: &str) {
    gauge!(
        "info",
        "version" => version.to_string(),
        "commit" => commit.to_string()
    )
    .set(1.0);
}

/// 처리한 요청 하나를 기록합니다. 결과와 무관하게 호출됩니다.
pub fn record_request(domain: &str, path: &str, method: &str, code: u16, duration: Duration) {
    let labels = [
        ("domain", domain.to_string()),
        ("path", path.to_string()),
        ("method", method.to_string()),
        ("code", code.to_string()),
    ];

    counter!("requests_total", &labels).increment(1);
    histogram!("request_duration_seconds", &labels).record(duration.as_secs_f64());
}
