use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `RateLimiter` 규칙의 인자입니다.
///
/// `window_duration`은 `"3s"`, `"500ms"` 같은 단위 접미사 문자열입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub request_limit: u32,
    #[serde(with = "humantime_serde")]
    pub window_duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let config: RateLimitConfig =
            serde_json::from_str(r#"{"request_limit":2,"window_duration":"3s"}"#).unwrap();

        assert_eq!(config.request_limit, 2);
        assert_eq!(config.window_duration, Duration::from_secs(3));
    }

    #[test]
    fn test_parse_args_with_subsecond_window() {
        let config: RateLimitConfig =
            serde_json::from_str(r#"{"request_limit":10,"window_duration":"250ms"}"#).unwrap();

        assert_eq!(config.window_duration, Duration::from_millis(250));
    }

    #[test]
    fn test_reject_bad_duration() {
        // 단위 없는 숫자는 거부
        let result =
            serde_json::from_str::<RateLimitConfig>(r#"{"request_limit":1,"window_duration":"3"}"#);
        assert!(result.is_err());
    }
}
