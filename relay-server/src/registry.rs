//! 客户端注册表
//!
//! 别名 → 连接句柄的共享映射。所有读写都经过 RwLock 串行化，
//! 广播迭代一律基于时点快照，绝不直接遍历在线状态。

use std::collections::HashMap;
use std::net::SocketAddr;

use protocol::Frame;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// 连接标识，由服务端在 accept 时分配，进程内唯一
pub type ConnectionId = u64;

/// 指向一个活跃连接的轻量句柄。
///
/// 句柄只负责投递，不拥有连接：socket 写半部由该连接的
/// 写端任务独占，关闭连接始终是连接处理器自己的事。
#[derive(Clone, Debug)]
pub struct ClientHandle {
    id: ConnectionId,
    addr: SocketAddr,
    outbox: mpsc::Sender<Frame>,
}

impl ClientHandle {
    pub fn new(id: ConnectionId, addr: SocketAddr, outbox: mpsc::Sender<Frame>) -> Self {
        Self { id, addr, outbox }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// 将帧投递到该连接的发送队列。
    ///
    /// 队列已关闭（写端任务退出）或持续打满（对端停滞）都视为
    /// 对端失效，返回 false，由调用方负责将其移出注册表。
    pub fn try_deliver(&self, frame: Frame) -> bool {
        self.outbox.try_send(frame).is_ok()
    }
}

/// 别名 → 连接句柄的注册表
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<String, ClientHandle>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册别名。别名已被占用时拒绝并返回 false，在位者不受影响。
    pub async fn register(&self, alias: &str, handle: ClientHandle) -> bool {
        let mut clients = self.clients.write().await;
        if clients.contains_key(alias) {
            debug!(%alias, "alias already registered, rejecting");
            return false;
        }
        clients.insert(alias.to_string(), handle);
        true
    }

    /// 按连接身份移除注册项，返回被移除的别名。
    ///
    /// 线性扫描匹配存储的句柄，在聊天规模下开销可以接受。
    pub async fn unregister(&self, id: ConnectionId) -> Option<String> {
        let mut clients = self.clients.write().await;
        let alias = clients
            .iter()
            .find(|(_, handle)| handle.id == id)
            .map(|(alias, _)| alias.clone())?;
        clients.remove(&alias);
        Some(alias)
    }

    /// 按别名查找连接句柄
    pub async fn lookup(&self, alias: &str) -> Option<ClientHandle> {
        self.clients.read().await.get(alias).cloned()
    }

    /// 广播迭代使用的时点快照
    pub async fn snapshot(&self) -> Vec<ClientHandle> {
        self.clients.read().await.values().cloned().collect()
    }

    /// 当前注册的别名集合（按字典序）
    pub async fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.clients.read().await.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    /// 在线注册数
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn test_handle(id: ConnectionId) -> (ClientHandle, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(256);
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        (ClientHandle::new(id, addr, tx), rx)
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = ClientRegistry::new();
        let (handle, _rx) = test_handle(1);

        assert!(registry.register("alice", handle).await);
        assert_eq!(registry.lookup("alice").await.unwrap().id(), 1);
        assert!(registry.lookup("bob").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_alias_rejected() {
        let registry = ClientRegistry::new();
        let (first, _rx1) = test_handle(1);
        let (second, _rx2) = test_handle(2);

        assert!(registry.register("alice", first).await);
        assert!(!registry.register("alice", second).await);
        // 在位者保持不变
        assert_eq!(registry.lookup("alice").await.unwrap().id(), 1);
    }

    #[tokio::test]
    async fn test_unregister_by_connection_identity() {
        let registry = ClientRegistry::new();
        let (handle, _rx) = test_handle(7);
        registry.register("carol", handle).await;

        assert_eq!(registry.unregister(7).await.as_deref(), Some("carol"));
        assert!(registry.lookup("carol").await.is_none());
        assert_eq!(registry.unregister(7).await, None);
    }

    #[tokio::test]
    async fn test_snapshot_is_stable_copy() {
        let registry = ClientRegistry::new();
        let (a, _rx1) = test_handle(1);
        let (b, _rx2) = test_handle(2);
        registry.register("alice", a).await;
        registry.register("bob", b).await;

        let snapshot = registry.snapshot().await;
        registry.unregister(1).await;

        // 快照不随后续变更失效
        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_unregister_with_broadcasts() {
        let registry = Arc::new(ClientRegistry::new());
        let mut receivers = Vec::new();
        let mut tasks = Vec::new();

        // 100 个别名并发注册，偶数 id 随后并发反注册
        for id in 0..100u64 {
            let (handle, rx) = test_handle(id);
            receivers.push(rx);
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let alias = format!("user{id}");
                assert!(registry.register(&alias, handle).await);
                if id % 2 == 0 {
                    registry.unregister(id).await;
                }
            }));
        }

        // 与 100 次广播式快照迭代交错进行
        for i in 0..100 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                for handle in registry.snapshot().await {
                    let _ = handle.try_deliver(Frame::text(format!("round {i}")));
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }

        // 最终状态恰好是仍在线的奇数别名
        let expected: Vec<String> = {
            let mut v: Vec<String> = (0..100u64)
                .filter(|id| id % 2 == 1)
                .map(|id| format!("user{id}"))
                .collect();
            v.sort();
            v
        };
        assert_eq!(registry.aliases().await, expected);
    }
}
