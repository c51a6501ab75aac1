//! 连接封装
//!
//! 将 TCP 流和帧编解码封装在一起，提供帧级收发接口。

use std::net::SocketAddr;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::codec::{FrameReader, FrameWriter};
use crate::error::Result;
use crate::frame::Frame;
use crate::transport::{self, TransportConfig};

/// 帧级连接
pub struct Connection {
    peer_addr: SocketAddr,
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
}

impl Connection {
    /// 作为客户端连接到服务端
    pub async fn connect(addr: &str, config: &TransportConfig) -> Result<Self> {
        let stream = transport::connect(addr, config).await?;
        Self::from_stream(stream)
    }

    /// 从已接受的 TcpStream 创建（服务端 accept 后使用）
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let peer_addr = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            peer_addr,
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
        })
    }

    /// 对端地址
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// 分离为读取端和写入端，用于并发读写
    pub fn split(self) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }

    /// 接收一帧
    pub async fn recv(&mut self) -> Result<Frame> {
        self.reader.read_frame().await
    }

    /// 发送一帧
    pub async fn send(&mut self, frame: &Frame) -> Result<()> {
        self.writer.write_frame(frame).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RelayListener;

    #[tokio::test]
    async fn test_connection_send_recv() {
        let listener = RelayListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut conn = Connection::connect(&addr.to_string(), &TransportConfig::default())
                .await
                .unwrap();
            conn.send(&Frame::text("alice")).await.unwrap();

            let reply = conn.recv().await.unwrap();
            assert_eq!(reply, Frame::text("welcome"));
        });

        let (stream, _peer) = listener.accept().await.unwrap();
        let mut conn = Connection::from_stream(stream).unwrap();

        let hello = conn.recv().await.unwrap();
        assert_eq!(hello, Frame::text("alice"));
        conn.send(&Frame::text("welcome")).await.unwrap();

        client.await.unwrap();
    }
}
