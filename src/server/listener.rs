use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

use super::handler::RequestHandler;

pub struct ServerListener {
    listener: TcpListener,
    shutdown: watch::Receiver<bool>,
}

impl ServerListener {
    pub async fn bind(addr: SocketAddr, shutdown: watch::Receiver<bool>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!(error = %e, addr = %addr, "리스너 바인딩 실패");
            e
        })?;

        info!(addr = %addr, "HTTP 리스너 시작");

        Ok(Self { listener, shutdown })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(mut self, handler: Arc<RequestHandler>) {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, client_addr)) => {
                            let handler = Arc::clone(&handler);
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let handler = Arc::clone(&handler);
                                    async move { handler.handle(req, client_addr).await }
                                });

                                // HTTP/1.1과 HTTP/2를 함께 지원하고, HTTP/1.1
                                // 연결은 WebSocket 업그레이드가 가능해야 합니다
                                if let Err(e) = AutoBuilder::new(TokioExecutor::new())
                                    .serve_connection_with_upgrades(io, service)
                                    .await
                                {
                                    debug!(error = %e, "연결 처리 종료");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "연결 수락 실패");
                        }
                    }
                }
                _ = self.shutdown.changed() => {
                    info!("리스너 종료");
                    break;
                }
            }
        }
    }
}
