//! 单连接处理
//!
//! 连接生命周期: Connecting → Registered → Active → Closing → Closed。
//! 读循环归本任务所有；socket 写半部交给独立的写端任务，
//! 经每连接发送队列顺序写出，保证同一对端的帧不会交错。

use std::net::SocketAddr;
use std::sync::Arc;

use protocol::{
    parse_private, validate_alias, Connection, Frame, FrameWriter, ProtocolError, PRIVATE_PREFIX,
    OUTBOX_CAPACITY,
};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::registry::{ClientHandle, ClientRegistry, ConnectionId};
use crate::router::Router;

/// 处理单个客户端连接，从 accept 到关闭。
///
/// 所有退出路径都会按连接身份反注册并结束写端任务。
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    id: ConnectionId,
    registry: Arc<ClientRegistry>,
    router: Router,
    mut shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let conn = Connection::from_stream(stream)?;
    let (mut reader, mut writer) = conn.split();

    // 连接后的第一帧即别名
    let alias = match reader.read_frame().await {
        Ok(Frame::Text { content }) => content.trim().to_string(),
        Ok(_) => {
            debug!(%addr, "first frame was not text, closing");
            return Ok(());
        }
        Err(e) => {
            debug!(%addr, error = %e, "failed to read alias frame");
            return Ok(());
        }
    };
    if let Err(e) = validate_alias(&alias) {
        let _ = writer
            .write_frame(&Frame::text(format!("invalid alias: {e}")))
            .await;
        return Ok(());
    }

    let (outbox_tx, outbox_rx) = mpsc::channel(OUTBOX_CAPACITY);
    let handle = ClientHandle::new(id, addr, outbox_tx);

    // 别名冲突策略: 拒绝后来者，在位者不受影响
    if !registry.register(&alias, handle).await {
        warn!(%addr, %alias, "alias already in use, rejecting connection");
        let _ = writer
            .write_frame(&Frame::text(format!("alias '{alias}' is already in use")))
            .await;
        return Ok(());
    }
    info!(%addr, %alias, "client registered");

    // 写端任务独占写半部，顺序消费发送队列
    let writer_task = tokio::spawn(write_outbound(writer, outbox_rx));

    loop {
        tokio::select! {
            result = reader.read_frame() => match result {
                Ok(frame) => {
                    if let Err(e) = frame.validate() {
                        warn!(%alias, error = %e, "frame exceeds limits, dropped");
                        continue;
                    }
                    dispatch(&router, &alias, id, addr, frame).await;
                }
                Err(ProtocolError::ConnectionClosed) => {
                    info!(%alias, "client disconnected");
                    break;
                }
                Err(e) if e.is_recoverable() => {
                    // 流仍在帧边界上，丢弃该帧继续服务
                    warn!(%alias, error = %e, "malformed frame dropped");
                }
                Err(e) => {
                    warn!(%alias, error = %e, "connection error, closing");
                    break;
                }
            },
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!(%alias, "shutdown signal received, closing connection");
                    break;
                }
            }
        }
    }

    // 清理: 别名可能已被路由器在投递失败时先行摘除。
    // 反注册丢掉最后一个发送端，写端任务清空队列后自行退出。
    if registry.unregister(id).await.is_some() {
        info!(%alias, "client unregistered");
    }
    let _ = writer_task.await;
    Ok(())
}

/// 按帧种类分发到路由器
async fn dispatch(router: &Router, alias: &str, id: ConnectionId, addr: SocketAddr, frame: Frame) {
    match frame {
        Frame::Text { content } => {
            if let Some((recipient, message)) = parse_private(&content) {
                router.directed_send(alias, recipient, message).await;
            } else if content.starts_with(PRIVATE_PREFIX) {
                warn!(%alias, "malformed private directive dropped");
            } else {
                debug!(%alias, "broadcasting text message");
                router.broadcast(alias, &content, id).await;
            }
        }
        Frame::File {
            filename,
            media_type,
            payload,
        } => {
            debug!(%alias, %filename, len = payload.len(), "relaying file");
            router
                .relay_file(id, addr, &filename, &media_type, &payload)
                .await;
        }
    }
}

/// 写端任务: 顺序写出发送队列中的帧，写失败即停止。
///
/// 队列停止消费后，路由器的后续投递会失败并触发注册表清理。
async fn write_outbound(mut writer: FrameWriter<OwnedWriteHalf>, mut outbox: mpsc::Receiver<Frame>) {
    while let Some(frame) = outbox.recv().await {
        if let Err(e) = writer.write_frame(&frame).await {
            debug!(error = %e, "outbound write failed, stopping writer task");
            break;
        }
    }
}
