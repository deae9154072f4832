//! UI-facing handle to a running runtime.

use courier_proto::RoomId;
use tokio::sync::mpsc;

use crate::RuntimeError;

/// Command sent from a [`ChatHandle`] to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    SwitchRoom(RoomId),
    PostMessage(String),
    RequestOlder,
    Shutdown,
}

/// Cloneable handle for issuing chat commands to a [`crate::Runtime`].
///
/// Commands are processed in the order they are sent. None of them touch the
/// message log directly; results arrive through the log and gate observers.
#[derive(Debug, Clone)]
pub struct ChatHandle {
    commands: mpsc::Sender<Command>,
}

impl ChatHandle {
    pub(crate) fn new(commands: mpsc::Sender<Command>) -> Self {
        Self { commands }
    }

    /// Switch to `room_id`. The server answers with its history.
    pub async fn switch_room(&self, room_id: RoomId) -> Result<(), RuntimeError> {
        self.send(Command::SwitchRoom(room_id)).await
    }

    /// Post a message to the current room.
    pub async fn post_message(&self, content: impl Into<String>) -> Result<(), RuntimeError> {
        self.send(Command::PostMessage(content.into())).await
    }

    /// Ask for the page before the oldest held message.
    pub async fn request_older(&self) -> Result<(), RuntimeError> {
        self.send(Command::RequestOlder).await
    }

    /// Close the connection and stop the runtime.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<(), RuntimeError> {
        self.commands.send(command).await.map_err(|_| RuntimeError::Stopped)
    }
}
