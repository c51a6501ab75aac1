//! 中继服务器
//!
//! 绑定监听地址，无限 accept；每个连接交给一个独立任务处理。
//! accept 失败只记录日志不中断循环，监听套接字失效才是致命的。

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use protocol::{Connection, Frame, RelayListener, MAX_CONNECTIONS};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::handler;
use crate::registry::ClientRegistry;
use crate::router::Router;

/// 中继服务器
pub struct RelayServer {
    listener: RelayListener,
    registry: Arc<ClientRegistry>,
    router: Router,
    connection_count: Arc<AtomicU32>,
    next_connection_id: AtomicU64,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl RelayServer {
    /// 绑定监听地址
    pub async fn bind(addr: &str) -> protocol::Result<Self> {
        let listener = RelayListener::bind(addr).await?;
        let registry = Arc::new(ClientRegistry::new());
        let router = Router::new(Arc::clone(&registry));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            listener,
            registry,
            router,
            connection_count: Arc::new(AtomicU32::new(0)),
            next_connection_id: AtomicU64::new(1),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// 实际监听地址（绑定 0 号端口时由测试使用）
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// 运行 accept 循环（支持 Ctrl+C 触发的 graceful shutdown）
    pub async fn run(self) -> anyhow::Result<()> {
        info!("Relay server listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.spawn_handler(stream, addr),
                        Err(e) => error!("Failed to accept connection: {e}"),
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal, initiating graceful shutdown...");
                    self.shutdown().await;
                    break;
                }
            }
        }

        Ok(())
    }

    /// 为新连接启动处理任务
    fn spawn_handler(&self, stream: TcpStream, addr: std::net::SocketAddr) {
        if !self.try_add_connection() {
            warn!(%addr, "connection limit reached, rejecting");
            tokio::spawn(async move {
                if let Ok(mut conn) = Connection::from_stream(stream) {
                    let _ = conn
                        .send(&Frame::text("server is full, try again later"))
                        .await;
                }
            });
            return;
        }

        let id = self.next_connection_id.fetch_add(1, Ordering::SeqCst);
        let registry = Arc::clone(&self.registry);
        let router = self.router.clone();
        let shutdown_rx = self.shutdown_rx.clone();
        let count = Arc::clone(&self.connection_count);

        tokio::spawn(async move {
            if let Err(e) =
                handler::handle_connection(stream, addr, id, registry, router, shutdown_rx).await
            {
                debug!(%addr, "connection handler error: {e}");
            }
            count.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// 增加连接数，超过上限返回 false
    fn try_add_connection(&self) -> bool {
        loop {
            let current = self.connection_count.load(Ordering::SeqCst);
            if current >= MAX_CONNECTIONS as u32 {
                return false;
            }
            if self
                .connection_count
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// 执行 graceful shutdown: 通知所有连接处理器退出并等待其断开
    async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);

        let start = std::time::Instant::now();
        let timeout_duration = std::time::Duration::from_secs(5);

        while self.connection_count.load(Ordering::SeqCst) > 0 {
            if start.elapsed() > timeout_duration {
                warn!(
                    "Shutdown timeout, {} connections still active",
                    self.connection_count.load(Ordering::SeqCst)
                );
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }

        info!("Server shutdown complete");
    }
}
