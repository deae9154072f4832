//! Error types for the connection state machine.

use thiserror::Error;

use crate::connection::ConnectionStatus;

/// Errors returned by [`crate::ConnectionManager`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// A frame was offered for sending while no connection is open.
    ///
    /// The frame is dropped. There is no outbound queue.
    #[error("not connected: connection is {status:?}")]
    NotConnected {
        /// Status at the time of the send attempt.
        status: ConnectionStatus,
    },
}

impl ConnectionError {
    /// Returns true if this error may clear up without caller intervention.
    ///
    /// A send that fails because the socket is down succeeds again once the
    /// reconnect timer brings the connection back.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotConnected { .. })
    }
}
