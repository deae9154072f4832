//! WebSocket driver for the terminal client.
//!
//! Implements the [`Driver`] trait on top of the tokio-tungstenite transport.
//! Each generation gets its own socket task; their reports are multiplexed on
//! one channel and handed to the runtime in arrival order.

use std::collections::HashMap;

use courier_app::{Driver, DriverEvent};
use courier_client::{
    Generation,
    transport::{self, SocketHandle, TransportConfig, TransportEvent},
};
use tokio::sync::mpsc;
use url::Url;

use crate::CliError;

/// Socket driver implementing the [`Driver`] trait.
pub struct SocketDriver {
    config: TransportConfig,
    sockets: HashMap<Generation, SocketHandle>,
    events_tx: mpsc::UnboundedSender<(Generation, TransportEvent)>,
    events: mpsc::UnboundedReceiver<(Generation, TransportEvent)>,
}

impl SocketDriver {
    /// Create a driver with no open sockets.
    pub fn new(config: TransportConfig) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        Self { config, sockets: HashMap::new(), events_tx, events }
    }

    /// Number of socket tasks still tracked.
    pub fn socket_count(&self) -> usize {
        self.sockets.len()
    }

    fn socket(&self, generation: Generation) -> Result<&SocketHandle, CliError> {
        self.sockets.get(&generation).ok_or(CliError::UnknownSocket(generation))
    }
}

impl Driver for SocketDriver {
    type Error = CliError;

    fn open(&mut self, generation: Generation, url: &Url) -> Result<(), Self::Error> {
        tracing::debug!(%generation, %url, "opening socket");
        let handle = transport::spawn(generation, url, &self.config, self.events_tx.clone());
        if let Some(previous) = self.sockets.insert(generation, handle) {
            previous.stop();
        }
        Ok(())
    }

    fn send_text(&mut self, generation: Generation, text: String) -> Result<(), Self::Error> {
        self.socket(generation)?.send_text(text).map_err(CliError::from)
    }

    fn close(&mut self, generation: Generation, code: u16, reason: &str) -> Result<(), Self::Error> {
        self.socket(generation)?.close(code, reason.to_string()).map_err(CliError::from)
    }

    async fn next_event(&mut self) -> Option<DriverEvent> {
        let (generation, event) = self.events.recv().await?;

        Some(match event {
            TransportEvent::Opened => DriverEvent::Opened { generation },
            TransportEvent::OpenFailed(reason) => {
                self.sockets.remove(&generation);
                DriverEvent::OpenFailed { generation, reason }
            },
            TransportEvent::Text(text) => DriverEvent::Text { generation, text },
            TransportEvent::Closed(close) => {
                self.sockets.remove(&generation);
                DriverEvent::Closed { generation, close }
            },
        })
    }

    fn stop(&mut self) {
        // The runtime already waited out the live socket's close; whatever is
        // left gets a close frame but no wait
        let count = self.sockets.len();
        self.sockets.clear();
        tracing::debug!(count, "socket driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_to_unknown_generation_fails() {
        let mut driver = SocketDriver::new(TransportConfig::default());
        let result = driver.send_text(Generation::new(3), "x".into());
        assert!(matches!(result, Err(CliError::UnknownSocket(g)) if g == Generation::new(3)));
        assert!(matches!(
            driver.close(Generation::new(3), 1000, "logout"),
            Err(CliError::UnknownSocket(_))
        ));
    }

    #[tokio::test]
    async fn failed_open_is_reported_and_forgotten() {
        let mut driver = SocketDriver::new(TransportConfig::default());
        // Bind then release a port so nothing is listening on it
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("ws://{addr}/chat/websocket")).unwrap();

        driver.open(Generation::new(1), &url).unwrap();
        assert_eq!(driver.socket_count(), 1);

        let event = driver.next_event().await.unwrap();
        assert!(matches!(event, DriverEvent::OpenFailed { generation, .. } if generation.get() == 1));
        assert_eq!(driver.socket_count(), 0);
    }
}
