//! 中继客户端核心实现
//!
//! 面向表示层的协作接口: 发送端提供 send_text / send_private /
//! send_file，接收端以事件流回调 Text / FileReceived / Disconnected。
//! 本 crate 不包含任何交互界面。

use std::path::{Path, PathBuf};

use protocol::{
    format_private, validate_alias, Connection, Frame, FrameReader, FrameWriter, ProtocolError,
    Result, TransportConfig, MAX_FILE_BYTES, RECEIVED_FILE_PREFIX,
};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 事件通道容量
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// 服务器地址，格式为 "host:port"
    pub server_addr: String,
    /// 连接时注册的别名
    pub alias: String,
    /// 接收文件的落盘目录
    pub download_dir: PathBuf,
    /// 传输层配置
    pub transport: TransportConfig,
}

impl ClientConfig {
    pub fn new(server_addr: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            alias: alias.into(),
            download_dir: PathBuf::from("."),
            transport: TransportConfig::default(),
        }
    }

    /// 指定接收文件的落盘目录
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }
}

/// 网络层发给表示层的事件
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// 收到文本消息（广播、私聊或文件到达通知）
    Text { content: String },
    /// 收到文件并已落盘
    FileReceived {
        filename: String,
        media_type: String,
        /// 落盘路径: `<download_dir>/received_<原文件名>`
        path: PathBuf,
        len: usize,
    },
    /// 连接已断开，接收任务随之结束
    Disconnected { reason: String },
}

/// 中继客户端
///
/// 持有连接的写半部；读半部由 `connect` 启动的接收任务独占，
/// 事件经返回的通道交给表示层。
pub struct RelayClient {
    alias: String,
    writer: FrameWriter<OwnedWriteHalf>,
}

impl RelayClient {
    /// 连接服务器并注册别名，返回客户端与事件接收端
    pub async fn connect(config: ClientConfig) -> Result<(Self, mpsc::Receiver<ClientEvent>)> {
        validate_alias(&config.alias)?;

        let conn = Connection::connect(&config.server_addr, &config.transport).await?;
        let (reader, mut writer) = conn.split();

        // 连接后的第一帧即别名
        writer.write_frame(&Frame::text(config.alias.clone())).await?;
        info!(alias = %config.alias, server = %config.server_addr, "connected");

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(receive_loop(reader, event_tx, config.download_dir));

        Ok((
            Self {
                alias: config.alias,
                writer,
            },
            event_rx,
        ))
    }

    /// 注册的别名
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// 发送广播文本
    pub async fn send_text(&mut self, content: &str) -> Result<()> {
        let frame = Frame::text(content);
        frame.validate()?;
        self.writer.write_frame(&frame).await
    }

    /// 发送私聊消息（组装 PRIVATE 指令）
    pub async fn send_private(&mut self, recipient: &str, content: &str) -> Result<()> {
        let frame = Frame::text(format_private(recipient, content));
        frame.validate()?;
        self.writer.write_frame(&frame).await
    }

    /// 读取本地文件并作为文件帧发送，媒体类型按扩展名推断
    pub async fn send_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let payload = tokio::fs::read(path).await?;
        if payload.len() > MAX_FILE_BYTES {
            return Err(ProtocolError::FileTooLarge {
                len: payload.len(),
                max: MAX_FILE_BYTES,
            });
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let media_type = crate::media::media_type_for(&filename);

        debug!(%filename, %media_type, len = payload.len(), "sending file");
        self.writer
            .write_frame(&Frame::File {
                filename,
                media_type: media_type.to_string(),
                payload,
            })
            .await
    }
}

/// 接收任务: 读取帧并转换为表示层事件，连接断开后结束
async fn receive_loop(
    mut reader: FrameReader<OwnedReadHalf>,
    event_tx: mpsc::Sender<ClientEvent>,
    download_dir: PathBuf,
) {
    loop {
        let event = match reader.read_frame().await {
            Ok(Frame::Text { content }) => ClientEvent::Text { content },
            Ok(Frame::File {
                filename,
                media_type,
                payload,
            }) => match save_received_file(&download_dir, &filename, &payload).await {
                Ok(path) => ClientEvent::FileReceived {
                    filename,
                    media_type,
                    path,
                    len: payload.len(),
                },
                Err(e) => {
                    warn!(%filename, error = %e, "failed to save received file");
                    continue;
                }
            },
            Err(ProtocolError::ConnectionClosed) => {
                let _ = event_tx
                    .send(ClientEvent::Disconnected {
                        reason: "connection closed by server".to_string(),
                    })
                    .await;
                break;
            }
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "malformed frame dropped");
                continue;
            }
            Err(e) => {
                let _ = event_tx
                    .send(ClientEvent::Disconnected {
                        reason: e.to_string(),
                    })
                    .await;
                break;
            }
        };

        if event_tx.send(event).await.is_err() {
            // 表示层已不再监听
            break;
        }
    }
}

/// 将接收到的文件负载写入下载目录。
///
/// 只取文件名的末级分量，杜绝路径穿越；同名文件直接覆盖。
async fn save_received_file(download_dir: &Path, filename: &str, payload: &[u8]) -> Result<PathBuf> {
    let basename = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());
    let path = download_dir.join(format!("{RECEIVED_FILE_PREFIX}{basename}"));
    tokio::fs::write(&path, payload).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_received_file_strips_path_components() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_received_file(dir.path(), "../../etc/passwd", b"data")
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("received_passwd"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_save_received_file_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        save_received_file(dir.path(), "note.txt", b"old").await.unwrap();
        let path = save_received_file(dir.path(), "note.txt", b"new").await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"new");
    }
}
