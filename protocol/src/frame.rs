//! 帧类型与文本约定

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::{MAX_ALIAS_LEN, MAX_FILE_BYTES, MAX_MESSAGE_LEN};

/// 私聊指令前缀（叠加在文本帧之上的约定，由连接处理器解析）
pub const PRIVATE_PREFIX: &str = "PRIVATE:";

/// 协议帧：客户端与服务端之间交换的最小完整单元
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Frame {
    /// 文本帧：原始 UTF-8 内容，协议层不再细分结构
    Text { content: String },
    /// 文件传输帧：文件名、媒体类型标签和完整负载。
    /// 负载长度即声明长度，编解码层保证逐字节完整。
    File {
        filename: String,
        media_type: String,
        payload: Vec<u8>,
    },
}

impl Frame {
    /// 构造文本帧
    pub fn text(content: impl Into<String>) -> Self {
        Frame::Text {
            content: content.into(),
        }
    }

    /// 校验帧内容是否符合约束
    pub fn validate(&self) -> Result<()> {
        match self {
            Frame::Text { content } => {
                if content.len() > MAX_MESSAGE_LEN {
                    return Err(ProtocolError::MessageTooLong {
                        len: content.len(),
                        max: MAX_MESSAGE_LEN,
                    });
                }
            }
            Frame::File { payload, .. } => {
                if payload.len() > MAX_FILE_BYTES {
                    return Err(ProtocolError::FileTooLarge {
                        len: payload.len(),
                        max: MAX_FILE_BYTES,
                    });
                }
            }
        }
        Ok(())
    }
}

/// 校验别名格式（连接后首个文本帧的内容）
pub fn validate_alias(alias: &str) -> Result<()> {
    if alias.is_empty() {
        return Err(ProtocolError::AliasEmpty);
    }
    if alias.len() > MAX_ALIAS_LEN {
        return Err(ProtocolError::AliasTooLong {
            len: alias.len(),
            max: MAX_ALIAS_LEN,
        });
    }
    Ok(())
}

/// 解析 `PRIVATE:<alias>:<message>` 私聊指令。
///
/// 不是合法指令时返回 `None`，由调用方决定按普通文本处理还是丢弃。
pub fn parse_private(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix(PRIVATE_PREFIX)?;
    let (recipient, message) = rest.split_once(':')?;
    if recipient.is_empty() {
        return None;
    }
    Some((recipient, message))
}

/// 组装私聊指令（客户端发送端使用）
pub fn format_private(recipient: &str, message: &str) -> String {
    format!("{PRIVATE_PREFIX}{recipient}:{message}")
}
