use tracing::Level;
use tracing_subscriber::EnvFilter;

/// tracing 구독자를 초기화합니다. `RUST_LOG`가 있으면 그 값이 우선하고,
/// 없으면 주어진 레벨로 이 크레이트의 로그만 올립니다.
pub fn init(level: &str) {
    let directive = format!("baker={}", level)
        .parse()
        .unwrap_or_else(|_| Level::INFO.into());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive(directive),
        )
        .with_target(true)
        .init();
}
