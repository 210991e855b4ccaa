//! Docker 디스커버리 어댑터입니다.
//!
//! `baker.enable=true` 라벨이 붙은 실행 중 컨테이너를 드라이버에 Add로
//! 밀어 넣고, 이후 이벤트 스트림을 따라 start/die를 Add/Remove로
//! 변환합니다. 라우팅 의도 자체는 코어의 핑 사이클이 컨테이너에게 직접
//! 물어봅니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bollard::container::ListContainersOptions;
use bollard::models::EventMessage;
use bollard::system::EventsOptions;
use bollard::Docker;
use futures_util::stream::StreamExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::core::{Container, Driver, StaticHints};

#[derive(Debug)]
pub enum DockerError {
    /// Docker 데몬 연결 실패
    Connection { source: bollard::errors::Error },
    /// Docker API 호출 실패
    Api { source: bollard::errors::Error },
    /// 컨테이너 라벨 설정 오류
    ContainerConfig {
        container_id: String,
        reason: String,
    },
}

impl fmt::Display for DockerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection { source } => write!(f, "Docker 연결 실패: {}", source),
            Self::Api { source } => write!(f, "Docker API 오류: {}", source),
            Self::ContainerConfig {
                container_id,
                reason,
            } => write!(f, "컨테이너 {} 설정 오류: {}", container_id, reason),
        }
    }
}

impl std::error::Error for DockerError {}

impl From<bollard::errors::Error> for DockerError {
    fn from(source: bollard::errors::Error) -> Self {
        Self::Api { source }
    }
}

/// `baker.*` 라벨에서 읽은 컨테이너 설정입니다.
#[derive(Debug, Default)]
struct Label {
    enable: bool,
    network: String,
    port: u16,
    ping: String,
    static_domain: String,
    static_path: String,
    static_headers: HashMap<String, String>,
}

fn parse_labels(
    container_id: &str,
    labels: &HashMap<String, String>,
) -> Result<Label, DockerError> {
    let mut label = Label::default();

    for (key, value) in labels {
        match key.as_str() {
            "baker.enable" => label.enable = value.to_lowercase() == "true",
            "baker.network" => label.network = value.clone(),
            "baker.service.port" => {
                label.port = value.parse().map_err(|e| DockerError::ContainerConfig {
                    container_id: container_id.to_string(),
                    reason: format!("포트 파싱 실패: {}", e),
                })?;
            }
            "baker.service.ping" => label.ping = value.clone(),
            "baker.service.static.domain" => label.static_domain = value.clone(),
            "baker.service.static.path" => label.static_path = value.clone(),
            key => {
                if let Some(name) = key.strip_prefix("baker.service.static.headers.") {
                    label.static_headers.insert(name.to_string(), value.clone());
                }
            }
        }
    }

    Ok(label)
}

/// Docker 데몬을 디스커버리 소스로 쓰는 어댑터입니다.
pub struct DockerDriver {
    docker: Docker,
    close: watch::Sender<bool>,
}

impl DockerDriver {
    pub fn new() -> Result<Self, DockerError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|source| DockerError::Connection { source })?;
        let (close, _) = watch::channel(false);

        Ok(Self { docker, close })
    }

    /// 드라이버를 받아 디스커버리를 시작합니다.
    ///
    /// 현재 실행 중인 컨테이너를 먼저 일괄 등록한 뒤 이벤트 스트림을
    /// 따라갑니다.
    pub fn register_driver(&self, driver: Arc<dyn Driver>) {
        let docker = self.docker.clone();
        let mut close_rx = self.close.subscribe();

        tokio::spawn(async move {
            load_current_containers(&docker, driver.as_ref()).await;

            tokio::select! {
                _ = close_rx.changed() => {}
                _ = watch_events(&docker, driver.as_ref()) => {}
            }

            debug!("docker 어댑터 중단");
        });
    }

    pub fn close(&self) {
        let _ = self.close.send(true);
    }
}

async fn load_current_containers(docker: &Docker, driver: &dyn Driver) {
    let options = ListContainersOptions::<String> {
        filters: HashMap::from([
            (
                "label".to_string(),
                vec!["baker.enable=true".to_string()],
            ),
            ("status".to_string(), vec!["running".to_string()]),
        ]),
        ..Default::default()
    };

    let containers = match docker.list_containers(Some(options)).await {
        Ok(containers) => containers,
        Err(e) => {
            error!(error = %e, "컨테이너 목록 조회 실패");
            return;
        }
    };

    info!(count = containers.len(), "실행 중인 컨테이너 등록 시작");

    for summary in containers {
        let Some(id) = summary.id else {
            continue;
        };

        match load_container(docker, &id).await {
            Ok(container) => driver.add(container),
            Err(e) => error!(container_id = %id, error = %e, "컨테이너 로드 실패"),
        }
    }
}

async fn load_container(docker: &Docker, id: &str) -> Result<Container, DockerError> {
    let inspect = docker.inspect_container(id, None).await?;

    let labels = inspect
        .config
        .and_then(|c| c.labels)
        .unwrap_or_default();
    let label = parse_labels(id, &labels)?;

    if !label.enable {
        return Err(DockerError::ContainerConfig {
            container_id: id.to_string(),
            reason: "baker.enable 라벨이 true가 아님".to_string(),
        });
    }

    let networks = inspect
        .network_settings
        .and_then(|s| s.networks)
        .unwrap_or_default();
    let network = networks
        .get(&label.network)
        .ok_or_else(|| DockerError::ContainerConfig {
            container_id: id.to_string(),
            reason: format!("네트워크 '{}' 없음", label.network),
        })?;

    // IP가 아직 없으면 주소 없이 등록합니다. 핑 사이클이 실패로 집계하다가
    // 어댑터가 다시 Add 하면 채워집니다.
    let addr = network
        .ip_address
        .as_deref()
        .filter(|ip| !ip.is_empty())
        .map(|ip| {
            format!("{}:{}", ip, label.port)
                .parse()
                .map_err(|e| DockerError::ContainerConfig {
                    container_id: id.to_string(),
                    reason: format!("주소 파싱 실패: {}", e),
                })
        })
        .transpose()?;

    debug!(container_id = %id, addr = ?addr, config = %label.ping, "컨테이너 로드");

    Ok(Container {
        id: id.to_string(),
        config_path: label.ping,
        addr,
        hints: StaticHints {
            domain: label.static_domain,
            path: label.static_path,
            headers: label.static_headers,
        },
    })
}

async fn watch_events(docker: &Docker, driver: &dyn Driver) {
    let options = EventsOptions::<String> {
        filters: HashMap::from([
            ("type".to_string(), vec!["container".to_string()]),
            (
                "event".to_string(),
                vec!["start".to_string(), "die".to_string()],
            ),
        ]),
        ..Default::default()
    };

    let mut events = Box::pin(docker.events(Some(options)));

    while let Some(event) = events.next().await {
        match event {
            Ok(message) => handle_event(docker, driver, message).await,
            Err(e) => {
                error!(error = %e, "이벤트 디코딩 실패");
            }
        }
    }

    warn!("Docker 이벤트 스트림 종료");
}

async fn handle_event(docker: &Docker, driver: &dyn Driver, message: EventMessage) {
    let Some(id) = message.actor.and_then(|actor| actor.id) else {
        return;
    };
    let action = message.action.unwrap_or_default();

    debug!(container_id = %id, action = %action, "docker 이벤트 수신");

    match action.as_str() {
        "die" => {
            // Remove는 id만으로 식별됩니다
            driver.remove(Container {
                id,
                config_path: String::new(),
                addr: None,
                hints: StaticHints::default(),
            });
        }
        "start" => match load_container(docker, &id).await {
            Ok(container) => driver.add(container),
            Err(e) => error!(container_id = %id, error = %e, "컨테이너 로드 실패"),
        },
        _ => {}
    }
}
