use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

/// 토큰 버킷 구현
#[derive(Debug)]
struct TokenBucket {
    /// 현재 사용 가능한 토큰 수
    tokens: f64,
    /// 마지막 업데이트 시간
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    /// 토큰 하나를 소비하려고 시도합니다.
    fn try_consume(&mut self, rate: f64, capacity: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update);

        // 토큰 보충
        self.tokens = (self.tokens + elapsed.as_secs_f64() * rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// 다음 토큰이 사용 가능할 때까지 남은 시간을 반환합니다.
    fn time_to_next_token(&self, rate: f64) -> Duration {
        if self.tokens >= 1.0 || rate <= 0.0 {
            Duration::from_secs(0)
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / rate)
        }
    }
}

/// 클라이언트 키별 토큰 버킷 저장소입니다.
///
/// 윈도 동안 `request_limit`개가 보충되는 버킷을 키마다 하나씩 굴립니다.
/// 요청 경로에서 동시에 접근되므로 내부에서 잠급니다.
#[derive(Debug, Clone)]
pub struct TokenBucketStore {
    buckets: Arc<RwLock<HashMap<String, TokenBucket>>>,
    rate: f64,
    capacity: f64,
}

impl TokenBucketStore {
    pub fn new(request_limit: u32, window_duration: Duration) -> Self {
        let capacity = f64::from(request_limit);
        let window = window_duration.as_secs_f64();
        let rate = if window > 0.0 { capacity / window } else { 0.0 };

        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            rate,
            capacity,
        }
    }

    /// 요청을 처리할 수 있는지 확인합니다.
    pub async fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.write().await;

        let bucket = buckets.entry(key.to_string()).or_insert_with(|| {
            debug!(key, capacity = self.capacity, "새로운 토큰 버킷 생성");
            TokenBucket::new(self.capacity)
        });

        bucket.try_consume(self.rate, self.capacity)
    }

    /// 다음 요청까지 대기해야 하는 시간을 반환합니다.
    pub async fn time_to_next_request(&self, key: &str) -> Option<Duration> {
        let buckets = self.buckets.read().await;
        buckets.get(key).map(|bucket| bucket.time_to_next_token(self.rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_limit_basic() {
        // 3초 윈도에 2개 요청
        let store = TokenBucketStore::new(2, Duration::from_secs(3));
        let key = "10.0.0.1";

        assert!(store.check(key).await);
        assert!(store.check(key).await);
        assert!(!store.check(key).await);
    }

    #[tokio::test]
    async fn test_refill() {
        // 200ms 윈도에 1개 요청
        let store = TokenBucketStore::new(1, Duration::from_millis(200));
        let key = "10.0.0.1";

        assert!(store.check(key).await);
        assert!(!store.check(key).await);

        // 윈도가 지나면 다시 허용
        sleep(Duration::from_millis(250)).await;
        assert!(store.check(key).await);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = TokenBucketStore::new(1, Duration::from_secs(10));

        assert!(store.check("10.0.0.1").await);
        assert!(!store.check("10.0.0.1").await);

        // 다른 클라이언트는 별도 버킷
        assert!(store.check("10.0.0.2").await);
    }

    #[tokio::test]
    async fn test_time_to_next_request() {
        let store = TokenBucketStore::new(1, Duration::from_secs(10));
        let key = "10.0.0.1";

        assert!(store.time_to_next_request(key).await.is_none());

        assert!(store.check(key).await);
        let wait = store.time_to_next_request(key).await.unwrap();
        assert!(wait > Duration::from_secs(0));
    }
}
