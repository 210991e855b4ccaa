//! 라우팅 엔진의 코어: 데이터 모델, 단일 작성자 커맨드 루프, 라우팅
//! 테이블, 핑 사이클입니다.

pub mod data;
mod ping;
pub mod runner;
pub mod table;

pub use data::{ConfigDoc, Container, Driver, Endpoint, Rule, Service, StaticHints};
pub use runner::ActionRunner;
pub use table::RoutingTable;

use std::sync::Arc;

use tracing::error;

use crate::middleware::{MiddlewareCache, RuleRegistry};

use ping::PingCycle;
use runner::Command;

/// 액션 러너의 워커가 소유하는 상태 묶음입니다.
///
/// 커맨드는 전부 여기서 처리되며, 커맨드 안에서는 기다리지 않습니다.
/// 핑 조회처럼 오래 걸리는 일은 태스크로 내보내고 결과를 다시 커맨드로
/// 받습니다.
pub(crate) struct Core {
    table: RoutingTable,
    cache: MiddlewareCache,
    pinger: PingCycle,
}

impl Core {
    pub(crate) fn new(registry: Arc<RuleRegistry>, cache: MiddlewareCache) -> Self {
        Self {
            table: RoutingTable::new(),
            cache,
            pinger: PingCycle::new(registry),
        }
    }

    pub(crate) fn dispatch(&mut self, command: Command, runner: &Arc<ActionRunner>) {
        match command {
            Command::Pinger => {
                let snapshot = self.table.snapshot();
                self.pinger.run(snapshot, runner);
            }
            Command::Add { container } => self.table.add(container),
            Command::Update {
                container,
                endpoint,
            } => self.table.update(container, endpoint, &self.cache),
            Command::Remove { container } => self.table.remove(&container, &self.cache),
            Command::Get {
                domain,
                path,
                reply,
            } => {
                // 호출자가 이미 포기했으면 응답은 그냥 버려집니다
                let _ = reply.send(self.table.resolve(&domain, &path));
            }
            Command::PingOk { id } => self.table.reset_misses(&id),
            Command::PingMiss { id } => {
                if let Some(container) = self.table.record_miss(&id) {
                    error!(
                        container_id = %container.id,
                        "컨테이너가 응답하지 않아 라우팅에서 제거합니다"
                    );
                    self.table.remove(&container, &self.cache);
                }
            }
        }
    }
}
