use tracing::{error, info};

use baker::config::Settings;
use baker::docker::DockerDriver;
use baker::middleware::{path, rate_limit};
use baker::server::{Server, ServerListener, ServerOptions};
use baker::{logging, metrics};

#[tokio::main]
async fn main() {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            std::process::exit(1);
        }
    };

    logging::init(&settings.log_level);

    metrics::init(settings.metrics_addr);
    metrics::set_info(
        env!("CARGO_PKG_VERSION"),
        option_env!("BAKER_GIT_COMMIT").unwrap_or("development"),
    );

    let server = Server::new(
        ServerOptions::default()
            .with_buffer_size(settings.buffer_size)
            .with_ping_duration(settings.ping_duration)
            .with_rules(vec![
                rate_limit::register,
                path::register_append_path,
                path::register_replace_path,
            ]),
    );

    let docker = match DockerDriver::new() {
        Ok(docker) => docker,
        Err(e) => {
            error!(error = %e, "Docker 연결 실패");
            std::process::exit(1);
        }
    };
    server.register_driver(|driver| docker.register_driver(driver));

    let listener = match ServerListener::bind(settings.http_addr, server.subscribe_close()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "리스너 시작 실패");
            std::process::exit(1);
        }
    };

    info!(addr = %settings.http_addr, "프록시 서버 시작");
    listener.run(server.handler()).await;
}
