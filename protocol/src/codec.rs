//! 帧编解码
//!
//! 帧格式:
//! ```text
//! ┌────────────┬────────────────┬────────────────────────────────┐
//! │ Version(1B)│  Length (4B)   │       Payload (bincode Frame)  │
//! │    u8      │    u32 BE      │                                │
//! └────────────┴────────────────┴────────────────────────────────┘
//! ```
//!
//! 显式长度前缀取代对读取粒度或写入间隔的任何依赖：
//! 读取端在消费满声明长度之前绝不把后续字节当作新帧。

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};
use crate::frame::Frame;
use crate::{MAX_FRAME_SIZE, PROTOCOL_VERSION};

/// 帧头大小: 1 字节版本 + 4 字节长度
const HEADER_SIZE: usize = 5;

/// 读缓冲初始容量，不足时按帧长扩容
const INITIAL_BUFFER_CAPACITY: usize = 4096;

fn map_eof(e: std::io::Error) -> ProtocolError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::ConnectionClosed
    } else {
        ProtocolError::Io(e)
    }
}

/// 帧读取器
pub struct FrameReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// 创建新的帧读取器
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// 读取并解码一帧，挂起直到整帧可用或流关闭。
    ///
    /// 负载在反序列化之前已被完整消费，因此 `Codec` 错误之后
    /// 流仍停在帧边界上，可以继续读取下一帧。
    pub async fn read_frame(&mut self) -> Result<Frame> {
        let mut header = [0u8; HEADER_SIZE];
        self.reader
            .read_exact(&mut header)
            .await
            .map_err(map_eof)?;

        let version = header[0];
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                actual: version,
            });
        }

        // 长度字段为大端序
        let length = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
        if length > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: length,
                max: MAX_FRAME_SIZE,
            });
        }

        if self.buffer.len() < length {
            self.buffer.resize(length, 0);
        }
        self.reader
            .read_exact(&mut self.buffer[..length])
            .await
            .map_err(map_eof)?;

        let frame = bincode::deserialize(&self.buffer[..length])?;
        Ok(frame)
    }
}

/// 帧写入器
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// 创建新的帧写入器
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 编码并写入一帧
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let payload = bincode::serialize(frame)?;
        if payload.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: payload.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        let mut header = [0u8; HEADER_SIZE];
        header[0] = PROTOCOL_VERSION;
        header[1..5].copy_from_slice(&(payload.len() as u32).to_be_bytes());

        self.writer.write_all(&header).await?;
        self.writer.write_all(&payload).await?;
        self.writer.flush().await?;

        Ok(())
    }
}
