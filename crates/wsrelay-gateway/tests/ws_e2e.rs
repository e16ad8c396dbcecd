//! End-to-end tests over a real WebSocket listener bound to port 0.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use wsrelay_core::{Envelope, Kind};
use wsrelay_gateway::{app_state::AppState, config::RelayConfig, server};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start() -> (SocketAddr, AppState, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(RelayConfig::default());
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let serve_state = state.clone();
    tokio::spawn(async move {
        let shutdown = async move {
            let _ = shutdown_rx.await;
        };
        let _ = server::run(listener, serve_state, shutdown).await;
    });

    (addr, state, shutdown_tx)
}

async fn connect(addr: SocketAddr) -> Ws {
    connect_at(addr, "/").await
}

async fn connect_at(addr: SocketAddr, path: &str) -> Ws {
    let (ws, _) = connect_async(format!("ws://{addr}{path}")).await.unwrap();
    ws
}

async fn next_envelope(ws: &mut Ws) -> Envelope {
    loop {
        let msg = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("read failed");
        if let Message::Text(_) = &msg {
            return Envelope::decode(msg.to_text().unwrap().as_bytes()).unwrap();
        }
    }
}

async fn assert_no_text(ws: &mut Ws) {
    if let Ok(Some(Ok(Message::Text(t)))) = timeout(Duration::from_millis(200), ws.next()).await {
        panic!("unexpected message: {}", t.as_str());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn join_chat_error_and_leave_over_websocket() {
    let (addr, state, _shutdown) = start().await;

    let mut a = connect(addr).await;
    let own = next_envelope(&mut a).await;
    assert_eq!(own.kind(), Kind::Joined);
    let a_id = own.contents().to_string();

    let mut b = connect(addr).await;
    let b_join = next_envelope(&mut b).await;
    assert_eq!(b_join.kind(), Kind::Joined);
    let b_id = b_join.contents().to_string();
    let seen = next_envelope(&mut a).await;
    assert_eq!(seen.kind(), Kind::Joined);
    assert_eq!(seen.contents(), b_id);
    assert_eq!(state.registry().len(), 2);

    a.send(Message::text(r#"{"sender":"A","contents":"hi"}"#)).await.unwrap();
    for ws in [&mut a, &mut b] {
        let env = next_envelope(ws).await;
        assert_eq!(env.kind(), Kind::Chat);
        assert_eq!(env.sender(), a_id);
        assert_eq!(env.contents(), "hi");
    }

    b.send(Message::text("{ nope")).await.unwrap();
    let err = next_envelope(&mut b).await;
    assert_eq!(err.kind(), Kind::Error);
    assert_eq!(err.sender(), "system");
    assert_no_text(&mut a).await;

    b.close(None).await.unwrap();
    let left = next_envelope(&mut a).await;
    assert_eq!(left.kind(), Kind::Left);
    assert_eq!(left.contents(), b_id);
    assert_eq!(state.registry().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn root_and_versioned_paths_share_one_relay() {
    let (addr, state, _shutdown) = start().await;

    let mut root = connect_at(addr, "/").await;
    let root_id = next_envelope(&mut root).await.contents().to_string();

    let mut versioned = connect_at(addr, "/v1/ws").await;
    let joined = next_envelope(&mut versioned).await;
    assert_eq!(joined.kind(), Kind::Joined);
    let seen = next_envelope(&mut root).await;
    assert_eq!(seen.contents(), joined.contents());
    assert_eq!(state.registry().len(), 2);

    versioned
        .send(Message::text(r#"{"sender":"v","contents":"over v1"}"#))
        .await
        .unwrap();
    let chat = next_envelope(&mut root).await;
    assert_eq!(chat.contents(), "over v1");
    assert_ne!(chat.sender(), root_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversized_frame_is_rejected_without_closing() {
    let (addr, _state, _shutdown) = start().await;

    let mut a = connect(addr).await;
    next_envelope(&mut a).await;

    let big = format!(r#"{{"sender":"A","contents":"{}"}}"#, "x".repeat(8192));
    a.send(Message::text(big)).await.unwrap();
    let err = next_envelope(&mut a).await;
    assert_eq!(err.kind(), Kind::Error);
    assert!(err.contents().contains("too large"));

    a.send(Message::text(r#"{"sender":"A","contents":"small"}"#)).await.unwrap();
    assert_eq!(next_envelope(&mut a).await.contents(), "small");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_marks_draining_and_notifies_clients() {
    let (addr, state, shutdown) = start().await;

    let mut a = connect(addr).await;
    next_envelope(&mut a).await;

    shutdown.send(()).unwrap();
    let notice = next_envelope(&mut a).await;
    assert_eq!(notice.kind(), Kind::Error);
    assert_eq!(notice.contents(), "relay shutting down");
    assert!(state.is_draining());
}
