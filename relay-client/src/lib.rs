//! 消息中继客户端核心库
//!
//! 协议层协作接口，不含任何交互界面:
//! - 发送: send_text / send_private / send_file
//! - 接收: ClientEvent 事件流（文本、文件落盘、断开）

mod client;
mod media;

pub use client::{ClientConfig, ClientEvent, RelayClient};
pub use media::media_type_for;
