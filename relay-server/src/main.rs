//! 消息中继服务端
//!
//! 基于 Tokio 的异步 TCP 中继服务器

use anyhow::Result;
use relay_server::RelayServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:12345";

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("relay_server=debug".parse()?)
                .add_directive("protocol=debug".parse()?),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    info!("Relay server starting on {}", addr);

    let server = RelayServer::bind(&addr).await?;
    server.run().await?;

    Ok(())
}
