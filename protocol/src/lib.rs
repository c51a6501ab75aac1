//! 消息中继共享协议库
//!
//! 包含:
//! - 帧类型与文本约定 (Frame, PRIVATE 指令)
//! - 帧编解码 (FrameReader, FrameWriter)
//! - TCP 传输层 (connect, RelayListener)
//! - 连接封装 (Connection)

mod codec;
mod connection;
mod constants;
mod error;
mod frame;
mod transport;

pub use codec::{FrameReader, FrameWriter};
pub use connection::Connection;
pub use constants::*;
pub use error::{ProtocolError, Result};
pub use frame::{format_private, parse_private, validate_alias, Frame, PRIVATE_PREFIX};
pub use transport::{connect, RelayListener, TransportConfig};
