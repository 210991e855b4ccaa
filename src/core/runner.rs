//! 모든 라우팅 상태 변경을 직렬화하는 단일 소비자 커맨드 큐입니다.
//!
//! 동시 호출은 전부 커맨드 레코드로 큐에 쌓이고, 전용 워커 하나가 도착
//! 순서대로 처리합니다. 큐가 가득 차면 호출자를 막는 대신 커맨드를
//! 버립니다. 라우팅 갱신이 요청 처리율을 조이는 일은 없어야 하고,
//! 잃어버린 갱신은 다음 핑이 다시 채워 줍니다.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error};

use crate::core::data::{Container, Driver, Endpoint};
use crate::core::Core;

pub(crate) enum Command {
    Pinger,
    Add {
        container: Container,
    },
    Update {
        container: Container,
        endpoint: Endpoint,
    },
    Remove {
        container: Container,
    },
    Get {
        domain: String,
        path: String,
        reply: oneshot::Sender<Option<(Container, Endpoint)>>,
    },
    /// 핑 태스크가 되돌려 보내는 결과. 실패 횟수는 워커에서만 바뀝니다.
    PingOk {
        id: String,
    },
    PingMiss {
        id: String,
    },
}

pub struct ActionRunner {
    commands: mpsc::Sender<Command>,
    closed: watch::Sender<bool>,
}

impl ActionRunner {
    /// 워커를 띄우고 핸들을 돌려줍니다. 워커가 `core`를 소유하므로
    /// 라우팅 테이블과의 경쟁은 구조적으로 불가능합니다.
    pub(crate) fn spawn(mut core: Core, buffer_size: usize) -> Arc<Self> {
        let (commands, mut receiver) = mpsc::channel(buffer_size);
        let (closed, mut closed_rx) = watch::channel(false);

        let runner = Arc::new(Self { commands, closed });
        let handle = Arc::clone(&runner);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = closed_rx.changed() => break,
                    command = receiver.recv() => match command {
                        Some(command) => core.dispatch(command, &handle),
                        None => break,
                    },
                }
            }
            debug!("액션 러너 중단");
        });

        runner
    }

    /// 종료를 알립니다. 이후의 push는 조용히 버려지고, 응답을 기다리던
    /// Get 호출자는 "no match"로 풀려납니다.
    pub fn close(&self) {
        let _ = self.closed.send(true);
    }

    pub fn pinger(&self) {
        self.push(Command::Pinger);
    }

    pub fn add(&self, container: Container) {
        self.push(Command::Add { container });
    }

    pub fn update(&self, container: Container, endpoint: Endpoint) {
        self.push(Command::Update {
            container,
            endpoint,
        });
    }

    pub fn remove(&self, container: Container) {
        self.push(Command::Remove { container });
    }

    /// 요청 경로에서 유일하게 기다리는 지점입니다. 러너가 닫혔거나 push가
    /// 버려졌으면 응답 채널이 끊기면서 None이 됩니다.
    pub async fn get(&self, domain: &str, path: &str) -> Option<(Container, Endpoint)> {
        let (reply, response) = oneshot::channel();

        self.push(Command::Get {
            domain: domain.to_string(),
            path: path.to_string(),
            reply,
        });

        response.await.unwrap_or(None)
    }

    pub(crate) fn ping_ok(&self, id: &str) {
        self.push(Command::PingOk { id: id.to_string() });
    }

    pub(crate) fn ping_miss(&self, id: &str) {
        self.push(Command::PingMiss { id: id.to_string() });
    }

    fn push(&self, command: Command) {
        if *self.closed.borrow() {
            return;
        }

        match self.commands.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                error!("커맨드 큐가 가득 참, 이벤트를 버립니다");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

#[async_trait]
impl Driver for ActionRunner {
    fn add(&self, container: Container) {
        ActionRunner::add(self, container);
    }

    fn update(&self, container: Container, endpoint: Endpoint) {
        ActionRunner::update(self, container, endpoint);
    }

    fn remove(&self, container: Container) {
        ActionRunner::remove(self, container);
    }

    fn pinger(&self) {
        ActionRunner::pinger(self);
    }

    async fn get(&self, domain: &str, path: &str) -> Option<(Container, Endpoint)> {
        ActionRunner::get(self, domain, path).await
    }
}
