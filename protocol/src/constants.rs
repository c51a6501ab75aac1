//! 协议常量定义

use std::time::Duration;

/// 协议版本号
pub const PROTOCOL_VERSION: u8 = 1;

/// 别名最大长度
pub const MAX_ALIAS_LEN: usize = 20;

/// 单条文本消息最大长度
pub const MAX_MESSAGE_LEN: usize = 4096;

/// 单个文件负载最大字节数
pub const MAX_FILE_BYTES: usize = 16 * 1024 * 1024;

/// 消息帧最大大小（文件负载上限外加帧封装余量）
pub const MAX_FRAME_SIZE: usize = MAX_FILE_BYTES + 1024;

/// 服务端最大连接数
pub const MAX_CONNECTIONS: usize = 100;

/// 每连接发送队列容量，队列满视为对端失效
pub const OUTBOX_CAPACITY: usize = 256;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);

/// 接收文件的落盘文件名前缀
pub const RECEIVED_FILE_PREFIX: &str = "received_";
