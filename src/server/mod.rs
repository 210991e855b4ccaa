//! 서버 조립: 액션 러너, 핑 티커, 요청 핸들러, 리스너를 묶습니다.

mod handler;
mod listener;

pub use handler::RequestHandler;
pub use listener::ServerListener;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::core::{ActionRunner, Core, Driver};
use crate::middleware::{MiddlewareCache, RegisterFunc, RuleRegistry};

/// 공개 설정 노브는 이 세 가지가 전부입니다. 나머지는 내부 구현입니다.
pub struct ServerOptions {
    pub buffer_size: usize,
    pub ping_duration: Duration,
    pub rules: Vec<RegisterFunc>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            buffer_size: 100,
            ping_duration: Duration::from_secs(10),
            rules: Vec::new(),
        }
    }
}

impl ServerOptions {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_ping_duration(mut self, ping_duration: Duration) -> Self {
        self.ping_duration = ping_duration;
        self
    }

    pub fn with_rules(mut self, rules: Vec<RegisterFunc>) -> Self {
        self.rules = rules;
        self
    }
}

pub struct Server {
    runner: Arc<ActionRunner>,
    registry: Arc<RuleRegistry>,
    cache: MiddlewareCache,
    close: watch::Sender<bool>,
}

impl Server {
    /// 워커와 핑 티커를 띄웁니다. tokio 런타임 안에서 호출해야 합니다.
    pub fn new(options: ServerOptions) -> Self {
        let registry = Arc::new(RuleRegistry::new(&options.rules));
        let cache = MiddlewareCache::new();

        let core = Core::new(Arc::clone(&registry), cache.clone());
        let runner = ActionRunner::spawn(core, options.buffer_size);

        let (close, mut close_rx) = watch::channel(false);

        let ticker = Arc::clone(&runner);
        let ping_duration = options.ping_duration;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = close_rx.changed() => break,
                    _ = tokio::time::sleep(ping_duration) => ticker.pinger(),
                }
            }
            debug!("핑 티커 중단");
        });

        Self {
            runner,
            registry,
            cache,
            close,
        }
    }

    /// 디스커버리 어댑터에 드라이버를 주입합니다.
    pub fn register_driver<F>(&self, register: F)
    where
        F: FnOnce(Arc<dyn Driver>),
    {
        register(self.runner.clone());
    }

    pub fn handler(&self) -> Arc<RequestHandler> {
        Arc::new(RequestHandler::new(
            Arc::clone(&self.runner),
            Arc::clone(&self.registry),
            self.cache.clone(),
        ))
    }

    /// 리스너 등이 종료 신호를 받을 수 있는 채널입니다.
    pub fn subscribe_close(&self) -> watch::Receiver<bool> {
        self.close.subscribe()
    }

    pub fn close(&self) {
        let _ = self.close.send(true);
        self.runner.close();
    }
}
