//! Driver trait for abstracting socket I/O.
//!
//! The [`Driver`] trait decouples the runtime from a specific WebSocket
//! implementation. The CLI implements it on top of tokio-tungstenite; tests
//! implement it with scripted event queues.

use std::future::Future;

use courier_client::{ClientEvent, CloseInfo, Generation};
use url::Url;

/// Socket report delivered by a driver, tagged with the socket's generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// Handshake completed.
    Opened {
        /// Socket generation.
        generation: Generation,
    },
    /// Handshake failed.
    OpenFailed {
        /// Socket generation.
        generation: Generation,
        /// Error text.
        reason: String,
    },
    /// Text frame received.
    Text {
        /// Socket generation.
        generation: Generation,
        /// Frame text.
        text: String,
    },
    /// Socket closed.
    Closed {
        /// Socket generation.
        generation: Generation,
        /// How it closed.
        close: CloseInfo,
    },
}

impl From<DriverEvent> for ClientEvent {
    fn from(event: DriverEvent) -> Self {
        match event {
            DriverEvent::Opened { generation } => Self::SocketOpened { generation },
            DriverEvent::OpenFailed { generation, reason } => {
                Self::SocketOpenFailed { generation, reason }
            },
            DriverEvent::Text { generation, text } => Self::FrameReceived { generation, text },
            DriverEvent::Closed { generation, close } => Self::SocketClosed { generation, close },
        }
    }
}

/// Abstracts socket I/O for the runtime.
///
/// Socket operations are fire-and-forget: their outcome comes back later
/// through [`Driver::next_event`]. A driver owns every socket it opens and
/// refers to each only by generation.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Start opening a socket to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot even be started. The runtime
    /// treats it as a failed open.
    fn open(&mut self, generation: Generation, url: &Url) -> Result<(), Self::Error>;

    /// Queue a text frame on the socket of `generation`.
    ///
    /// # Errors
    ///
    /// Returns an error if that socket is gone.
    fn send_text(&mut self, generation: Generation, text: String) -> Result<(), Self::Error>;

    /// Start the closing handshake on the socket of `generation`.
    ///
    /// # Errors
    ///
    /// Returns an error if that socket is gone. The runtime then treats it as
    /// closed.
    fn close(&mut self, generation: Generation, code: u16, reason: &str)
    -> Result<(), Self::Error>;

    /// Wait for the next socket report.
    ///
    /// Returns `None` once the driver can produce no more events.
    fn next_event(&mut self) -> impl Future<Output = Option<DriverEvent>> + Send;

    /// Tear down every socket and clean up resources.
    fn stop(&mut self);
}
