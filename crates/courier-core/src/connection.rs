//! Connection lifecycle state machine.
//!
//! Manages open, close and reconnect for the single chat socket. Uses the
//! action pattern: methods take events as input and return actions for the
//! driver to execute. The manager never touches the socket itself; it refers
//! to it only by [`Generation`].
//!
//! # State Machine
//!
//! ```text
//!            connect()            opened(g)
//! ┌────────┐ ───────> ┌────────────┐ ──────> ┌──────┐
//! │ Closed │          │ Connecting │         │ Open │
//! └────────┘ <─────── └────────────┘         └──────┘
//!   ^    ^   closed(g) / open_failed(g)         │ │
//!   │    │   (unclean: schedule retry g)        │ │ closed(g)
//!   │    └──────────────────────────────────────┘ │ (unclean: schedule retry g)
//!   │                                             │
//!   │ closed(g)      ┌─────────┐   disconnect()   │
//!   └─────────────── │ Closing │ <────────────────┘
//!                    └─────────┘
//! ```
//!
//! # Generations
//!
//! Every `connect()` starts a new generation. Transport events and retry ticks
//! carry the generation they belong to, and anything tagged with a
//! generation other than the current one is dropped. A retry scheduled by an
//! old close can therefore never reopen a connection that was explicitly
//! disconnected or already replaced.

use std::{fmt, time::Duration};

use courier_proto::endpoint;
use url::Url;

use crate::error::ConnectionError;

/// Delay between an unexpected closure and the single reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// WebSocket close code for a normal, intentional closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// WebSocket close code reported when no close frame was received.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Sequence number of a connection attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Wrap a raw generation number.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw generation number.
    pub const fn get(self) -> u64 {
        self.0
    }

    fn successor(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No live socket.
    Closed,
    /// Socket requested, not yet open.
    Connecting,
    /// Socket open, frames flow.
    Open,
    /// Close requested by us, waiting for the transport to confirm.
    Closing,
}

/// How a socket closed, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket close code.
    pub code: u16,
    /// Close reason text.
    pub reason: String,
    /// Closing handshake completed. False when the socket dropped.
    pub clean: bool,
}

impl CloseInfo {
    /// A close that completed the closing handshake.
    pub fn clean(code: u16, reason: impl Into<String>) -> Self {
        Self { code, reason: reason.into(), clean: true }
    }

    /// A close without a closing handshake (network drop, transport error).
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self { code: ABNORMAL_CLOSURE, reason: reason.into(), clean: false }
    }
}

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a socket to `url` and tag its events with `generation`.
    Open {
        /// Generation of the new socket.
        generation: Generation,
        /// Socket endpoint.
        url: Url,
    },

    /// Close the socket of `generation`.
    Close {
        /// Generation of the socket to close.
        generation: Generation,
        /// WebSocket close code.
        code: u16,
        /// Close reason text.
        reason: String,
    },

    /// Transmit a text frame on the socket of `generation`.
    Send {
        /// Generation of the target socket.
        generation: Generation,
        /// Encoded frame.
        text: String,
    },

    /// Call [`ConnectionManager::handle_retry`] with `generation` after
    /// `delay`.
    ScheduleReconnect {
        /// Generation whose closure scheduled the retry.
        generation: Generation,
        /// Delay before the retry fires.
        delay: Duration,
    },

    /// The socket of `generation` is open and ready for startup commands.
    Ready {
        /// Generation of the open socket.
        generation: Generation,
    },
}

/// Connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Chat socket endpoint.
    pub endpoint: Url,
    /// Delay before the reconnect attempt after an unexpected closure.
    pub reconnect_delay: Duration,
}

impl ConnectionConfig {
    /// Config for an already derived socket endpoint.
    pub fn new(endpoint: Url) -> Self {
        Self { endpoint, reconnect_delay: DEFAULT_RECONNECT_DELAY }
    }

    /// Config whose endpoint is derived from the HTTP API base URL.
    pub fn from_base_url(base: &Url) -> Result<Self, courier_proto::EndpointError> {
        endpoint::socket_url(base).map(Self::new)
    }
}

/// Connection state machine.
///
/// Owns the lifecycle of at most one live socket. Pure: no I/O, no timers.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    config: ConnectionConfig,
    status: ConnectionStatus,
    /// Generation of the most recent `connect()`.
    generation: Generation,
    /// Generation whose closure scheduled the outstanding retry, if any.
    pending_retry: Option<Generation>,
    last_close: Option<CloseInfo>,
}

impl ConnectionManager {
    /// Create a manager in [`ConnectionStatus::Closed`].
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            status: ConnectionStatus::Closed,
            generation: Generation::default(),
            pending_retry: None,
            last_close: None,
        }
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Generation of the most recent connection attempt.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Generation of the outstanding retry. `None` if no retry is scheduled.
    pub fn pending_retry(&self) -> Option<Generation> {
        self.pending_retry
    }

    /// How the last socket closed. `None` if no socket has closed yet.
    pub fn last_close(&self) -> Option<&CloseInfo> {
        self.last_close.as_ref()
    }

    /// Socket endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.config.endpoint
    }

    /// True if `generation` is the live, open socket.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.status == ConnectionStatus::Open && generation == self.generation
    }

    /// Open a new socket unless one is already live.
    ///
    /// No-op while Connecting or Open. From Closing, the socket being closed is
    /// abandoned and a new generation starts.
    pub fn connect(&mut self) -> Vec<ConnectionAction> {
        match self.status {
            ConnectionStatus::Connecting | ConnectionStatus::Open => {
                tracing::debug!(generation = %self.generation, status = ?self.status, "connect ignored, socket is live");
                vec![]
            },
            ConnectionStatus::Closed | ConnectionStatus::Closing => {
                self.generation = self.generation.successor();
                self.status = ConnectionStatus::Connecting;
                self.pending_retry = None;
                tracing::info!(generation = %self.generation, endpoint = %self.config.endpoint, "connecting");
                vec![ConnectionAction::Open {
                    generation: self.generation,
                    url: self.config.endpoint.clone(),
                }]
            },
        }
    }

    /// Close the live socket with a normal closure and cancel any retry.
    ///
    /// Idempotent: with no live socket this only cancels the pending retry.
    pub fn disconnect(&mut self, reason: &str) -> Vec<ConnectionAction> {
        if let Some(generation) = self.pending_retry.take() {
            tracing::debug!(%generation, "pending reconnect cancelled");
        }

        match self.status {
            ConnectionStatus::Connecting | ConnectionStatus::Open => {
                self.status = ConnectionStatus::Closing;
                tracing::info!(generation = %self.generation, reason, "disconnecting");
                vec![ConnectionAction::Close {
                    generation: self.generation,
                    code: NORMAL_CLOSURE,
                    reason: reason.to_string(),
                }]
            },
            ConnectionStatus::Closed | ConnectionStatus::Closing => vec![],
        }
    }

    /// Transmit a text frame on the open socket.
    ///
    /// # Errors
    ///
    /// `ConnectionError::NotConnected` unless the status is Open. The frame is
    /// not queued.
    pub fn send(&self, text: String) -> Result<ConnectionAction, ConnectionError> {
        if self.status != ConnectionStatus::Open {
            return Err(ConnectionError::NotConnected { status: self.status });
        }
        Ok(ConnectionAction::Send { generation: self.generation, text })
    }

    /// Transport reports the socket of `generation` is open.
    pub fn handle_opened(&mut self, generation: Generation) -> Vec<ConnectionAction> {
        if generation != self.generation || self.status != ConnectionStatus::Connecting {
            tracing::debug!(%generation, current = %self.generation, status = ?self.status, "stale open ignored");
            return vec![];
        }

        self.status = ConnectionStatus::Open;
        tracing::info!(%generation, "connection open");
        vec![ConnectionAction::Ready { generation }]
    }

    /// Transport reports the socket of `generation` closed.
    ///
    /// Schedules exactly one reconnect if the closure was neither requested by
    /// [`Self::disconnect`] nor clean.
    pub fn handle_closed(
        &mut self,
        generation: Generation,
        close: CloseInfo,
    ) -> Vec<ConnectionAction> {
        if generation != self.generation || self.status == ConnectionStatus::Closed {
            tracing::debug!(%generation, current = %self.generation, "stale close ignored");
            return vec![];
        }

        let requested = self.status == ConnectionStatus::Closing;
        let clean = close.clean;
        tracing::info!(%generation, code = close.code, reason = %close.reason, clean, requested, "connection closed");

        self.status = ConnectionStatus::Closed;
        self.last_close = Some(close);

        if requested || clean {
            return vec![];
        }

        self.pending_retry = Some(generation);
        tracing::warn!(%generation, delay = ?self.config.reconnect_delay, "unexpected closure, reconnect scheduled");
        vec![ConnectionAction::ScheduleReconnect { generation, delay: self.config.reconnect_delay }]
    }

    /// Transport reports the socket of `generation` failed to open.
    pub fn handle_open_failed(
        &mut self,
        generation: Generation,
        reason: &str,
    ) -> Vec<ConnectionAction> {
        self.handle_closed(generation, CloseInfo::abnormal(reason))
    }

    /// Retry timer scheduled by the closure of `generation` fired.
    ///
    /// Reconnects only if that retry is still outstanding. Ticks superseded by
    /// a disconnect or a newer connection are dropped.
    pub fn handle_retry(&mut self, generation: Generation) -> Vec<ConnectionAction> {
        if self.pending_retry != Some(generation) || self.status != ConnectionStatus::Closed {
            tracing::debug!(%generation, pending = ?self.pending_retry, "stale retry dropped");
            return vec![];
        }

        self.pending_retry = None;
        self.connect()
    }
}
