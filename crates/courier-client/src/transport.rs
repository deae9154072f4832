//! WebSocket transport for the client.
//!
//! Provides [`spawn`], which opens one socket on a background task and reports
//! its lifecycle and text frames on a channel, tagged with the generation the
//! [`Client`](crate::Client) assigned to it. This is a thin layer that only
//! moves text; protocol logic remains in the Sans-IO client.

use std::time::Duration;

use courier_core::{CloseInfo, Generation};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, time::Instant};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        handshake::client::Request,
        http::{HeaderValue, header::COOKIE},
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use url::Url;

/// Name of the cookie carrying the session token on the upgrade request.
pub const SESSION_COOKIE: &str = "jwt";

/// How long to wait for the peer to answer our close frame by default.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Close code reported when the peer's close frame carried no status.
const NO_STATUS_RECEIVED: u16 = 1005;

/// Transport errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The upgrade request could not be built.
    #[error("invalid request: {0}")]
    Request(String),

    /// The socket could not be opened.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The socket task is gone or the stream failed.
    #[error("stream error: {0}")]
    Stream(String),
}

/// Transport configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Session token sent as the `jwt` cookie. `None` sends no cookie.
    pub session_token: Option<String>,

    /// Time the peer has to answer our close frame. After it the socket is
    /// dropped and reported as an abnormal closure.
    pub close_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { session_token: None, close_timeout: DEFAULT_CLOSE_TIMEOUT }
    }
}

/// Lifecycle and data events reported by a socket task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed.
    Opened,
    /// Handshake failed. No `Closed` follows.
    OpenFailed(String),
    /// Text frame received.
    Text(String),
    /// Socket closed. Always the last event of an opened socket.
    Closed(CloseInfo),
}

#[derive(Debug)]
enum Outbound {
    Text(String),
    Close { code: u16, reason: String },
}

/// Handle to one spawned socket.
///
/// Dropping the handle starts a normal closure; the task ends once the peer
/// answers or the close timeout passes.
#[derive(Debug)]
pub struct SocketHandle {
    generation: Generation,
    outbound: mpsc::UnboundedSender<Outbound>,
    abort_handle: tokio::task::AbortHandle,
}

impl SocketHandle {
    /// Generation this socket reports its events with.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Queue a text frame.
    pub fn send_text(&self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(Outbound::Text(text))
            .map_err(|_| TransportError::Stream(format!("socket {} task stopped", self.generation)))
    }

    /// Start the closing handshake. `Closed` is reported once it completes or
    /// the close timeout passes.
    pub fn close(&self, code: u16, reason: String) -> Result<(), TransportError> {
        self.outbound
            .send(Outbound::Close { code, reason })
            .map_err(|_| TransportError::Stream(format!("socket {} task stopped", self.generation)))
    }

    /// Abort the socket task without a closing handshake or further events.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Build the upgrade request for `url`, attaching the session cookie.
pub fn build_request(url: &Url, config: &TransportConfig) -> Result<Request, TransportError> {
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| TransportError::Request(e.to_string()))?;

    if let Some(token) = &config.session_token {
        let cookie = HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}"))
            .map_err(|e| TransportError::Request(format!("session cookie: {e}")))?;
        request.headers_mut().insert(COOKIE, cookie);
    }

    Ok(request)
}

/// Open a socket to `url` on a background task.
///
/// Every event the socket produces is sent on `events` tagged with
/// `generation`. Must be called from within a tokio runtime.
pub fn spawn(
    generation: Generation,
    url: &Url,
    config: &TransportConfig,
    events: mpsc::UnboundedSender<(Generation, TransportEvent)>,
) -> SocketHandle {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let request = build_request(url, config);
    let handle =
        tokio::spawn(run_socket(generation, request, config.close_timeout, outbound_rx, events));

    SocketHandle { generation, outbound: outbound_tx, abort_handle: handle.abort_handle() }
}

/// Run one socket: connect, then pump frames both ways until it closes.
async fn run_socket(
    generation: Generation,
    request: Result<Request, TransportError>,
    close_timeout: Duration,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<(Generation, TransportEvent)>,
) {
    let emit = |event: TransportEvent| {
        if events.send((generation, event)).is_err() {
            tracing::debug!(%generation, "transport event receiver dropped");
        }
    };

    let request = match request {
        Ok(request) => request,
        Err(e) => {
            emit(TransportEvent::OpenFailed(e.to_string()));
            return;
        },
    };

    let ws = match connect_async(request).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            tracing::debug!(%generation, error = %e, "socket open failed");
            emit(TransportEvent::OpenFailed(TransportError::Connect(e.to_string()).to_string()));
            return;
        },
    };

    emit(TransportEvent::Opened);
    let (mut sink, mut stream) = ws.split();
    let mut outbound_open = true;
    // Set once our close frame is out; the peer must answer before it
    let mut close_deadline: Option<Instant> = None;

    let close = loop {
        tokio::select! {
            command = outbound.recv(), if outbound_open => {
                let frame = match command {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = sink.send(Message::text(text)).await {
                            break CloseInfo::abnormal(e.to_string());
                        }
                        continue;
                    },
                    Some(Outbound::Close { code, reason }) => {
                        CloseFrame { code: CloseCode::from(code), reason: reason.into() }
                    },
                    None => CloseFrame { code: CloseCode::Normal, reason: "".into() },
                };

                // Nothing may follow our close frame
                outbound_open = false;
                close_deadline = Some(Instant::now() + close_timeout);
                if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                    break CloseInfo::abnormal(e.to_string());
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => emit(TransportEvent::Text(text.as_str().to_owned())),
                Some(Ok(Message::Close(frame))) => {
                    // Flushes the close reply tungstenite queued for a peer-initiated close
                    match tokio::time::timeout(close_timeout, sink.close()).await {
                        Ok(Ok(())) => {},
                        Ok(Err(e)) => tracing::debug!(%generation, error = %e, "close reply failed"),
                        Err(_) => tracing::debug!(%generation, "close reply timed out"),
                    }
                    break match frame {
                        Some(frame) => CloseInfo::clean(u16::from(frame.code), frame.reason.as_str()),
                        None => CloseInfo::clean(NO_STATUS_RECEIVED, ""),
                    };
                },
                // Binary, ping and pong frames carry nothing for the client
                Some(Ok(_)) => {},
                Some(Err(e)) => break CloseInfo::abnormal(e.to_string()),
                None => break CloseInfo::abnormal("stream ended without close frame"),
            },
            () = close_elapsed(close_deadline), if close_deadline.is_some() => {
                tracing::warn!(%generation, ?close_timeout, "peer did not answer close frame");
                break CloseInfo::abnormal("closing handshake timed out");
            },
        }
    };

    tracing::debug!(%generation, code = close.code, clean = close.clean, "socket task finished");
    emit(TransportEvent::Closed(close));
}

/// Resolve at the close deadline. Never resolves without one.
async fn close_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
