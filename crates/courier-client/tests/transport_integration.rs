//! Integration tests for the WebSocket transport.
//!
//! These tests run a real loopback WebSocket server and check that the
//! transport reports the lifecycle the client state machine relies on: open,
//! text in both directions, clean closes and abnormal drops.

use std::time::Duration;

use courier_client::{
    Generation,
    transport::{self, TransportConfig, TransportEvent},
};
use futures_util::{SinkExt, StreamExt};
use tokio::{net::TcpListener, sync::mpsc, time::timeout};
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        Message,
        handshake::server::{ErrorResponse, Request, Response},
    },
};
use url::Url;

const GENERATION: Generation = Generation::new(1);

/// What the loopback server does once a client connects.
#[derive(Debug, Clone, Copy)]
enum ServerScript {
    /// Send one frame, echo text until the client closes
    Echo,
    /// Send one frame, then close with code 1000 and wait for the reply
    CloseClean,
    /// Send one frame, then drop the TCP stream
    Drop,
    /// Send one frame, then hold the socket without ever reading from it
    Unresponsive,
}

/// A running loopback server.
struct Loopback {
    url: Url,
    /// Cookie header seen on the upgrade request
    cookies: mpsc::UnboundedReceiver<Option<String>>,
    /// Whether the client answered the server's close frame
    close_replies: mpsc::UnboundedReceiver<bool>,
}

async fn start_server(script: ServerScript) -> Loopback {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (cookie_tx, cookies) = mpsc::unbounded_channel();
    let (reply_tx, close_replies) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = |request: &Request, response: Response| {
            let cookie = request
                .headers()
                .get("cookie")
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let _ = cookie_tx.send(cookie);
            Ok::<_, ErrorResponse>(response)
        };
        let mut ws = accept_hdr_async(stream, callback).await.unwrap();
        ws.send(Message::text(r#"{"LoadMessages":[]}"#)).await.unwrap();

        match script {
            ServerScript::Echo => {
                while let Some(Ok(message)) = ws.next().await {
                    if message.is_text() {
                        ws.send(message).await.unwrap();
                    }
                }
            },
            ServerScript::CloseClean => {
                ws.close(None).await.unwrap();
                let mut replied = false;
                while let Some(Ok(message)) = ws.next().await {
                    replied |= message.is_close();
                }
                let _ = reply_tx.send(replied);
            },
            ServerScript::Drop => drop(ws),
            ServerScript::Unresponsive => {
                let _held = ws;
                std::future::pending::<()>().await;
            },
        }
    });

    let url = Url::parse(&format!("ws://{addr}/chat/websocket")).unwrap();
    Loopback { url, cookies, close_replies }
}

async fn next_event(
    events: &mut mpsc::UnboundedReceiver<(Generation, TransportEvent)>,
) -> TransportEvent {
    let (generation, event) = timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("transport event within timeout")
        .expect("event channel open");
    assert_eq!(generation, GENERATION);
    event
}

#[tokio::test]
async fn socket_opens_and_exchanges_text() {
    let mut server = start_server(ServerScript::Echo).await;
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let config = TransportConfig { session_token: Some("token".into()), ..Default::default() };

    let socket = transport::spawn(GENERATION, &server.url, &config, events_tx);

    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);
    assert_eq!(server.cookies.recv().await.unwrap().as_deref(), Some("jwt=token"));
    assert_eq!(
        next_event(&mut events).await,
        TransportEvent::Text(r#"{"LoadMessages":[]}"#.into())
    );

    socket.send_text(r#"{"SendMessage":{"content":"hi"}}"#.into()).unwrap();
    assert_eq!(
        next_event(&mut events).await,
        TransportEvent::Text(r#"{"SendMessage":{"content":"hi"}}"#.into())
    );

    socket.close(1000, "logout".into()).unwrap();
    let TransportEvent::Closed(close) = next_event(&mut events).await else {
        panic!("expected Closed");
    };
    assert!(close.clean);
    assert_eq!(close.code, 1000);
}

#[tokio::test]
async fn server_close_is_reported_clean() {
    let mut server = start_server(ServerScript::CloseClean).await;
    let (events_tx, mut events) = mpsc::unbounded_channel();

    let _socket = transport::spawn(GENERATION, &server.url, &TransportConfig::default(), events_tx);

    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);
    assert!(matches!(next_event(&mut events).await, TransportEvent::Text(_)));
    let TransportEvent::Closed(close) = next_event(&mut events).await else {
        panic!("expected Closed");
    };
    assert!(close.clean, "server completed the closing handshake: {close:?}");

    let replied = timeout(Duration::from_secs(5), server.close_replies.recv())
        .await
        .expect("server finished within timeout")
        .expect("server reported");
    assert!(replied, "client answered the server's close frame");
}

#[tokio::test]
async fn unanswered_close_times_out_as_abnormal() {
    let server = start_server(ServerScript::Unresponsive).await;
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let config =
        TransportConfig { close_timeout: Duration::from_millis(200), ..Default::default() };

    let socket = transport::spawn(GENERATION, &server.url, &config, events_tx);

    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);
    assert!(matches!(next_event(&mut events).await, TransportEvent::Text(_)));

    socket.close(1000, "logout".into()).unwrap();
    let TransportEvent::Closed(close) = next_event(&mut events).await else {
        panic!("expected Closed");
    };
    assert!(!close.clean);
    assert_eq!(close.code, 1006);
}

#[tokio::test]
async fn dropped_stream_is_reported_abnormal() {
    let server = start_server(ServerScript::Drop).await;
    let (events_tx, mut events) = mpsc::unbounded_channel();

    let _socket = transport::spawn(GENERATION, &server.url, &TransportConfig::default(), events_tx);

    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);
    assert!(matches!(next_event(&mut events).await, TransportEvent::Text(_)));
    let TransportEvent::Closed(close) = next_event(&mut events).await else {
        panic!("expected Closed");
    };
    assert!(!close.clean);
    assert_eq!(close.code, 1006);
}

#[tokio::test]
async fn unreachable_server_reports_open_failure() {
    // Bind then release a port so nothing is listening on it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("ws://{addr}/chat/websocket")).unwrap();
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let _socket = transport::spawn(GENERATION, &url, &TransportConfig::default(), events_tx);

    assert!(matches!(next_event(&mut events).await, TransportEvent::OpenFailed(_)));
}
