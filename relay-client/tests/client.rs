//! 客户端协作接口端到端测试
//!
//! 客户端与真实服务器对接，验证事件流和文件落盘行为。

use std::net::SocketAddr;
use std::time::Duration;

use relay_client::{ClientConfig, ClientEvent, RelayClient};
use relay_server::RelayServer;
use tokio::sync::mpsc;
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

async fn start_server() -> SocketAddr {
    let server = RelayServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn connect(
    addr: SocketAddr,
    alias: &str,
    download_dir: &std::path::Path,
) -> (RelayClient, mpsc::Receiver<ClientEvent>) {
    let config =
        ClientConfig::new(addr.to_string(), alias).with_download_dir(download_dir.to_path_buf());
    RelayClient::connect(config).await.unwrap()
}

async fn next_event(events: &mut mpsc::Receiver<ClientEvent>) -> ClientEvent {
    timeout(RECV_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn text_and_private_messages_arrive_as_events() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server().await;

    let (mut alice, _alice_events) = connect(addr, "alice", dir.path()).await;
    let (_bob, mut bob_events) = connect(addr, "bob", dir.path()).await;
    settle().await;

    alice.send_text("hello bob").await.unwrap();
    assert_eq!(
        next_event(&mut bob_events).await,
        ClientEvent::Text {
            content: "alice: hello bob".to_string()
        }
    );

    alice.send_private("bob", "between us").await.unwrap();
    assert_eq!(
        next_event(&mut bob_events).await,
        ClientEvent::Text {
            content: "PRIVATE from alice: between us".to_string()
        }
    );
}

#[tokio::test]
async fn received_file_is_written_byte_exact() {
    let send_dir = tempfile::tempdir().unwrap();
    let recv_dir = tempfile::tempdir().unwrap();
    let addr = start_server().await;

    let (mut alice, _alice_events) = connect(addr, "alice", send_dir.path()).await;
    let (_bob, mut bob_events) = connect(addr, "bob", recv_dir.path()).await;
    settle().await;

    let payload: Vec<u8> = (0..=255u8).cycle().take(12_345).collect();
    let source = send_dir.path().join("snapshot.png");
    tokio::fs::write(&source, &payload).await.unwrap();

    alice.send_file(&source).await.unwrap();

    match next_event(&mut bob_events).await {
        ClientEvent::FileReceived {
            filename,
            media_type,
            path,
            len,
        } => {
            assert_eq!(filename, "snapshot.png");
            assert_eq!(media_type, "photo");
            assert_eq!(len, payload.len());
            assert_eq!(path, recv_dir.path().join("received_snapshot.png"));
            assert_eq!(tokio::fs::read(&path).await.unwrap(), payload);
        }
        other => panic!("expected file event, got {other:?}"),
    }

    // 文件帧之后跟着来源通知
    match next_event(&mut bob_events).await {
        ClientEvent::Text { content } => {
            assert!(content.contains("sent photo: snapshot.png"), "got: {content}");
        }
        other => panic!("expected notification event, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_duplicate_alias_surfaces_as_disconnect() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server().await;

    let (_alice, _alice_events) = connect(addr, "alice", dir.path()).await;
    settle().await;

    let (_impostor, mut events) = connect(addr, "alice", dir.path()).await;

    // 先收到拒绝文本，然后连接被服务端关闭
    match next_event(&mut events).await {
        ClientEvent::Text { content } => {
            assert!(content.contains("already in use"), "got: {content}");
        }
        other => panic!("expected rejection text, got {other:?}"),
    }
    assert!(matches!(
        next_event(&mut events).await,
        ClientEvent::Disconnected { .. }
    ));
}
