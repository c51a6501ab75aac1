//! 错误类型定义

use thiserror::Error;

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 帧负载编解码错误
    #[error("Frame codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// 协议版本不匹配
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 别名为空
    #[error("Alias is empty")]
    AliasEmpty,

    /// 别名过长
    #[error("Alias too long: {len} chars (max: {max})")]
    AliasTooLong { len: usize, max: usize },

    /// 消息过长
    #[error("Message too long: {len} bytes (max: {max})")]
    MessageTooLong { len: usize, max: usize },

    /// 文件负载过大
    #[error("File payload too large: {len} bytes (max: {max})")]
    FileTooLarge { len: usize, max: usize },
}

impl ProtocolError {
    /// 读取到该错误后流是否仍处于帧边界上。
    ///
    /// `Codec` 错误发生在完整负载被消费之后，连接可以继续读下一帧；
    /// 其余错误要么是 IO 层面的，要么无法重新对齐帧边界，只能断开。
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProtocolError::Codec(_))
    }
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
