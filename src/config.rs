//! `BAKER_*` 환경 변수에서 읽는 프로세스 설정입니다.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    /// 액션 러너 커맨드 큐 용량
    pub buffer_size: usize,
    /// 핑 사이클 주기
    pub ping_duration: Duration,
    /// 프록시 리스너 주소
    pub http_addr: SocketAddr,
    /// 메트릭 스크레이프 주소
    pub metrics_addr: SocketAddr,
    /// 로그 레벨 (error | warn | info | debug | trace)
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    EnvVarInvalid {
        var_name: String,
        value: String,
        reason: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvVarInvalid {
                var_name,
                value,
                reason,
            } => write!(
                f,
                "환경 변수 {} 값 {} 유효하지 않음: {}",
                var_name, value, reason
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Settings {
    /// 모든 변수에 기본값이 있으므로 누락은 오류가 아닙니다.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Settings {
            buffer_size: parse_var("BAKER_BUFFER_SIZE", 100, |v| v.parse().ok())?,
            ping_duration: parse_var("BAKER_PING_DURATION", Duration::from_secs(10), |v| {
                humantime::parse_duration(v).ok()
            })?,
            http_addr: parse_var("BAKER_HTTP_ADDR", default_http_addr(), |v| v.parse().ok())?,
            metrics_addr: parse_var("BAKER_METRICS_ADDR", default_metrics_addr(), |v| {
                v.parse().ok()
            })?,
            log_level: env::var("BAKER_LOG_LEVEL")
                .map(|v| v.to_lowercase())
                .unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn default_http_addr() -> SocketAddr {
    "0.0.0.0:80".parse().unwrap()
}

fn default_metrics_addr() -> SocketAddr {
    "0.0.0.0:8089".parse().unwrap()
}

fn parse_var<T>(
    var_name: &str,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    match env::var(var_name) {
        Ok(value) => parse(&value).ok_or_else(|| ConfigError::EnvVarInvalid {
            var_name: var_name.to_string(),
            value: value.clone(),
            reason: "파싱 실패".to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cleanup_env() {
        for var in [
            "BAKER_BUFFER_SIZE",
            "BAKER_PING_DURATION",
            "BAKER_HTTP_ADDR",
            "BAKER_METRICS_ADDR",
            "BAKER_LOG_LEVEL",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        cleanup_env();

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.buffer_size, 100);
        assert_eq!(settings.ping_duration, Duration::from_secs(10));
        assert_eq!(settings.metrics_addr.port(), 8089);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    #[serial]
    fn test_overrides() {
        cleanup_env();
        env::set_var("BAKER_BUFFER_SIZE", "16");
        env::set_var("BAKER_PING_DURATION", "500ms");
        env::set_var("BAKER_LOG_LEVEL", "DEBUG");

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.buffer_size, 16);
        assert_eq!(settings.ping_duration, Duration::from_millis(500));
        assert_eq!(settings.log_level, "debug");

        cleanup_env();
    }

    #[test]
    #[serial]
    fn test_invalid_duration() {
        cleanup_env();
        env::set_var("BAKER_PING_DURATION", "십초");

        assert!(Settings::from_env().is_err());

        cleanup_env();
    }
}
