//! Client events and actions.

use std::time::Duration;

use courier_core::{CloseInfo, Generation};
use courier_proto::RoomId;
use url::Url;

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Forwarding transport reports, tagged with the socket's generation
/// - Firing the retry timer it was asked to schedule
/// - Forwarding the auth signal and application intents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The external auth signal has this value.
    AuthChanged(bool),

    /// Socket opened.
    SocketOpened {
        /// Socket generation.
        generation: Generation,
    },

    /// Socket could not be opened.
    SocketOpenFailed {
        /// Socket generation.
        generation: Generation,
        /// Transport error text.
        reason: String,
    },

    /// Text frame received.
    FrameReceived {
        /// Socket generation.
        generation: Generation,
        /// Raw frame text.
        text: String,
    },

    /// Socket closed.
    SocketClosed {
        /// Socket generation.
        generation: Generation,
        /// How it closed.
        close: CloseInfo,
    },

    /// A retry timer requested by [`ClientAction::ScheduleRetry`] fired.
    RetryElapsed {
        /// Generation carried by the scheduling action.
        generation: Generation,
    },

    /// Application wants to switch rooms.
    SwitchRoom {
        /// Room to switch to.
        room_id: RoomId,
    },

    /// Application wants to post a message to the current room.
    PostMessage {
        /// Message text.
        content: String,
    },

    /// Application wants the page before the oldest held message.
    RequestOlder,
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open a socket to `url`; report its events with `generation`.
    OpenSocket {
        /// Generation of the new socket.
        generation: Generation,
        /// Socket endpoint.
        url: Url,
    },

    /// Close the socket of `generation`.
    CloseSocket {
        /// Socket generation.
        generation: Generation,
        /// WebSocket close code.
        code: u16,
        /// Close reason.
        reason: String,
    },

    /// Send a text frame on the socket of `generation`.
    SendText {
        /// Socket generation.
        generation: Generation,
        /// Encoded frame.
        text: String,
    },

    /// Feed [`ClientEvent::RetryElapsed`] with `generation` after `delay`.
    ///
    /// At most one retry is outstanding. A new one replaces the old.
    ScheduleRetry {
        /// Generation to report back.
        generation: Generation,
        /// Delay before firing.
        delay: Duration,
    },
}
