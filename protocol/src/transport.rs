//! TCP 传输层
//!
//! 封装建连与监听：带超时的 connect、nodelay 设置，
//! 以及向上层暴露对端地址的监听器。

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener as TokioTcpListener, TcpStream};
use tokio::time::timeout;

use crate::error::{ProtocolError, Result};
use crate::CONNECT_TIMEOUT;

/// 传输层配置
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// 连接超时时间
    pub connect_timeout: Duration,
    /// 是否禁用 Nagle 算法（TCP nodelay）
    pub nodelay: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            nodelay: true, // 即时消息场景建议开启，减少延迟
        }
    }
}

/// 建立到服务端的 TCP 连接（客户端使用）
pub async fn connect(addr: &str, config: &TransportConfig) -> Result<TcpStream> {
    let stream = timeout(config.connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ProtocolError::ConnectionTimeout)?
        .map_err(ProtocolError::Io)?;
    stream.set_nodelay(config.nodelay)?;
    Ok(stream)
}

/// TCP 监听器（服务端使用）
///
/// accept 时同时返回对端地址，供注册表和文件转发通知使用。
pub struct RelayListener {
    listener: TokioTcpListener,
}

impl RelayListener {
    /// 绑定地址并开始监听
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TokioTcpListener::bind(addr)
            .await
            .map_err(ProtocolError::Io)?;
        Ok(Self { listener })
    }

    /// 接受新连接
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await.map_err(ProtocolError::Io)?;
        stream.set_nodelay(true)?;
        Ok((stream, addr))
    }

    /// 获取本地绑定地址
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
