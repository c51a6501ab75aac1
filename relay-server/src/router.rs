//! 消息路由
//!
//! 核心业务逻辑：广播、定向私聊、文件转发。
//! 所有操作都基于注册表快照迭代；对单个接收方的投递失败
//! 只会把该接收方移出注册表，不影响其余投递。

use std::net::SocketAddr;
use std::sync::Arc;

use protocol::Frame;
use tracing::{debug, warn};

use crate::registry::{ClientRegistry, ConnectionId};

/// 消息路由器
#[derive(Clone)]
pub struct Router {
    registry: Arc<ClientRegistry>,
}

impl Router {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// 广播文本给除发送者以外的所有在线客户端
    pub async fn broadcast(&self, sender_alias: &str, content: &str, exclude: ConnectionId) {
        let line = format!("{sender_alias}: {content}");
        for handle in self.registry.snapshot().await {
            if handle.id() == exclude {
                continue;
            }
            if !handle.try_deliver(Frame::text(line.clone())) {
                self.evict(handle.id()).await;
            }
        }
    }

    /// 定向投递给单个别名。
    ///
    /// 接收方不存在时静默丢弃，发送方得不到任何反馈，
    /// 这是协议约定的 fire-and-forget 语义。
    pub async fn directed_send(&self, sender_alias: &str, recipient_alias: &str, content: &str) {
        let Some(handle) = self.registry.lookup(recipient_alias).await else {
            debug!(
                sender = %sender_alias,
                recipient = %recipient_alias,
                "directed message to unknown alias dropped"
            );
            return;
        };
        let line = format!("PRIVATE from {sender_alias}: {content}");
        if !handle.try_deliver(Frame::text(line)) {
            self.evict(handle.id()).await;
        }
    }

    /// 把文件帧转发给除发送者以外的所有客户端，随后附带一条
    /// 说明来源地址、文件名和媒体类型的文本通知。
    ///
    /// 文件帧与通知帧经同一条发送队列投递，同对端顺序有保证。
    pub async fn relay_file(
        &self,
        exclude: ConnectionId,
        sender_addr: SocketAddr,
        filename: &str,
        media_type: &str,
        payload: &[u8],
    ) {
        let notification = format!("{} sent {media_type}: {filename}", sender_addr.ip());
        for handle in self.registry.snapshot().await {
            if handle.id() == exclude {
                continue;
            }
            let file_frame = Frame::File {
                filename: filename.to_string(),
                media_type: media_type.to_string(),
                payload: payload.to_vec(),
            };
            let delivered = handle.try_deliver(file_frame)
                && handle.try_deliver(Frame::text(notification.clone()));
            if !delivered {
                self.evict(handle.id()).await;
            }
        }
    }

    /// 将投递失败的连接移出注册表（尽力清理，不中断当前操作）
    async fn evict(&self, id: ConnectionId) {
        if let Some(alias) = self.registry.unregister(id).await {
            warn!(%alias, "unreachable client removed from registry");
        }
    }
}
