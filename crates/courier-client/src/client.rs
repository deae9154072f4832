//! Chat sync client state machine.
//!
//! Binds the connection lifecycle to the auth signal, decodes inbound frames
//! into message log and pagination updates, and encodes outbound commands.

use courier_core::{ConnectionAction, ConnectionManager, ConnectionStatus, Generation};
use courier_proto::{ChatMessage, ClientCommand, RoomId, ServerFrame};

use crate::{
    auth::{AuthBinding, AuthTransition},
    config::ClientConfig,
    event::{ClientAction, ClientEvent},
    pagination::PaginationGate,
    store::MessageLog,
};

/// Close reason sent when the auth signal drops or the client shuts down.
pub const LOGOUT_REASON: &str = "logout";

/// Chat sync client.
///
/// Owns the connection state machine, the message log and the pagination gate.
/// Feed it [`ClientEvent`]s through [`Client::handle`] and execute the
/// returned [`ClientAction`]s.
#[derive(Debug)]
pub struct Client {
    connection: ConnectionManager,
    auth: AuthBinding,
    messages: MessageLog,
    pagination: PaginationGate,
    /// Last room selected, re-announced on every (re)connect.
    room: Option<RoomId>,
}

impl Client {
    /// Create an unauthorized client with an empty log and a blocked gate.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            connection: ConnectionManager::new(config.connection),
            auth: AuthBinding::new(),
            messages: MessageLog::new(),
            pagination: PaginationGate::new(config.page_size),
            room: config.initial_room,
        }
    }

    /// Message log of the current room.
    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    /// Message log, for subscribing.
    pub fn messages_mut(&mut self) -> &mut MessageLog {
        &mut self.messages
    }

    /// Pagination gate.
    pub fn pagination(&self) -> &PaginationGate {
        &self.pagination
    }

    /// Pagination gate, for subscribing.
    pub fn pagination_mut(&mut self) -> &mut PaginationGate {
        &mut self.pagination
    }

    /// Connection status.
    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Connection state machine.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Last observed auth value.
    pub fn is_authorized(&self) -> bool {
        self.auth.is_authorized()
    }

    /// Room announced on connect. `None` until one is selected.
    pub fn current_room(&self) -> Option<RoomId> {
        self.room
    }

    /// Process an event and return the actions to execute.
    pub fn handle(&mut self, event: ClientEvent) -> Vec<ClientAction> {
        match event {
            ClientEvent::AuthChanged(authorized) => self.set_authorized(authorized),
            ClientEvent::SocketOpened { generation } => {
                let actions = self.connection.handle_opened(generation);
                self.convert_connection_actions(actions)
            },
            ClientEvent::SocketOpenFailed { generation, reason } => {
                let actions = self.connection.handle_open_failed(generation, &reason);
                self.convert_connection_actions(actions)
            },
            ClientEvent::FrameReceived { generation, text } => {
                self.handle_frame(generation, &text);
                vec![]
            },
            ClientEvent::SocketClosed { generation, close } => {
                let actions = self.connection.handle_closed(generation, close);
                self.convert_connection_actions(actions)
            },
            ClientEvent::RetryElapsed { generation } => self.handle_retry(generation),
            ClientEvent::SwitchRoom { room_id } => self.switch_room(room_id),
            ClientEvent::PostMessage { content } => self.post_message(content),
            ClientEvent::RequestOlder => self.request_older(),
        }
    }

    /// Observe the auth signal. Connects on false to true, disconnects on true
    /// to false.
    pub fn set_authorized(&mut self, authorized: bool) -> Vec<ClientAction> {
        match self.auth.observe(authorized) {
            AuthTransition::Authorized => {
                tracing::info!("authorized, connecting");
                let actions = self.connection.connect();
                self.convert_connection_actions(actions)
            },
            AuthTransition::Revoked => {
                tracing::info!("authorization revoked, disconnecting");
                let actions = self.connection.disconnect(LOGOUT_REASON);
                self.convert_connection_actions(actions)
            },
            AuthTransition::Unchanged => vec![],
        }
    }

    /// Select a room. The server answers with a full reset of its history.
    pub fn switch_room(&mut self, room_id: RoomId) -> Vec<ClientAction> {
        self.room = Some(room_id);
        self.send_command(&ClientCommand::ChangeGroup { group_id: room_id })
    }

    /// Post a message to the current room.
    ///
    /// Nothing is appended locally; the message shows up when the server
    /// echoes it back.
    pub fn post_message(&mut self, content: String) -> Vec<ClientAction> {
        self.send_command(&ClientCommand::SendMessage { content })
    }

    /// Request the page before the oldest held message.
    ///
    /// Skipped while the pagination gate is blocked.
    pub fn request_older(&mut self) -> Vec<ClientAction> {
        if self.pagination.is_blocked() {
            tracing::debug!(len = self.messages.len(), "older page request skipped, pagination blocked");
            return vec![];
        }

        let loaded = self.messages.len() as u64;
        self.send_command(&ClientCommand::RequestMessages { loaded })
    }

    /// Close the connection and release every observer registration.
    pub fn shutdown(&mut self) -> Vec<ClientAction> {
        self.auth.observe(false);
        let actions = self.connection.disconnect(LOGOUT_REASON);
        self.messages.clear_observers();
        self.pagination.clear_observers();
        tracing::info!("client shut down");
        self.convert_connection_actions(actions)
    }

    fn handle_retry(&mut self, generation: Generation) -> Vec<ClientAction> {
        if !self.auth.is_authorized() {
            tracing::debug!(%generation, "retry dropped, not authorized");
            return vec![];
        }
        let actions = self.connection.handle_retry(generation);
        self.convert_connection_actions(actions)
    }

    fn handle_frame(&mut self, generation: Generation, text: &str) {
        if !self.connection.is_current(generation) {
            tracing::debug!(%generation, "frame from stale socket dropped");
            return;
        }

        let frame = match ServerFrame::decode(text) {
            Ok(frame) => frame,
            Err(error) => {
                tracing::warn!(%generation, %error, "discarding undecodable frame");
                return;
            },
        };

        tracing::trace!(%generation, tag = frame.tag(), "frame received");
        match frame {
            ServerFrame::LoadMessages(messages) => self.apply_full_reset(messages),
            ServerFrame::Message(message) => self.apply_live_append(message),
            ServerFrame::LoadRequested(messages) => self.apply_backward_page(messages),
        }
    }

    fn apply_full_reset(&mut self, messages: Vec<ChatMessage>) {
        let len = messages.len();
        self.messages.replace(messages);
        self.pagination.on_full_reset(len);
        tracing::debug!(len, "message log reset");
    }

    fn apply_live_append(&mut self, message: ChatMessage) {
        self.messages.append(message);
    }

    fn apply_backward_page(&mut self, messages: Vec<ChatMessage>) {
        let len = messages.len();
        self.messages.prepend(messages);
        self.pagination.on_backward_page(len);
        tracing::debug!(len, total = self.messages.len(), "older page prepended");
    }

    fn send_command(&mut self, command: &ClientCommand) -> Vec<ClientAction> {
        let text = match command.encode() {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(tag = command.tag(), %error, "command encode failed");
                return vec![];
            },
        };

        match self.connection.send(text) {
            Ok(action) => self.convert_connection_actions(vec![action]),
            Err(error) => {
                tracing::warn!(tag = command.tag(), %error, "command dropped");
                vec![]
            },
        }
    }

    /// Translate connection actions. `Ready` expands into the startup command.
    fn convert_connection_actions(&mut self, actions: Vec<ConnectionAction>) -> Vec<ClientAction> {
        let mut out = Vec::with_capacity(actions.len());
        for action in actions {
            match action {
                ConnectionAction::Open { generation, url } => {
                    out.push(ClientAction::OpenSocket { generation, url });
                },
                ConnectionAction::Close { generation, code, reason } => {
                    out.push(ClientAction::CloseSocket { generation, code, reason });
                },
                ConnectionAction::Send { generation, text } => {
                    out.push(ClientAction::SendText { generation, text });
                },
                ConnectionAction::ScheduleReconnect { generation, delay } => {
                    out.push(ClientAction::ScheduleRetry { generation, delay });
                },
                ConnectionAction::Ready { generation } => {
                    if let Some(room_id) = self.room {
                        tracing::debug!(%generation, %room_id, "re-announcing room");
                        out.extend(self.switch_room(room_id));
                    }
                },
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use courier_core::CloseInfo;
    use url::Url;

    use super::*;

    const ROOM: RoomId = RoomId::from_u128(0x67e5_5044_10b1_426f_9247_bb68_0e5f_e0c8);

    fn client() -> Client {
        let endpoint = Url::parse("wss://host/chat/websocket").unwrap();
        Client::new(ClientConfig::new(endpoint))
    }

    fn open(client: &mut Client) -> Generation {
        let actions = client.handle(ClientEvent::AuthChanged(true));
        let Some(ClientAction::OpenSocket { generation, .. }) = actions.first() else {
            panic!("expected OpenSocket, got {actions:?}");
        };
        let generation = *generation;
        client.handle(ClientEvent::SocketOpened { generation });
        generation
    }

    fn frame(client: &mut Client, generation: Generation, text: &str) {
        let actions = client.handle(ClientEvent::FrameReceived { generation, text: text.into() });
        assert!(actions.is_empty());
    }

    fn contents(client: &Client) -> Vec<&str> {
        client.messages().snapshot().iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn unauthorized_client_stays_closed() {
        let mut client = client();
        assert!(client.handle(ClientEvent::AuthChanged(false)).is_empty());
        assert_eq!(client.connection_status(), ConnectionStatus::Closed);
        assert!(client.messages().is_empty());
        assert!(client.pagination().is_blocked());
    }

    #[test]
    fn ready_announces_current_room() {
        let mut client = client();
        let _ = client.switch_room(ROOM);

        let actions = client.handle(ClientEvent::AuthChanged(true));
        let generation = client.connection().generation();
        assert!(matches!(actions.as_slice(), [ClientAction::OpenSocket { .. }]));

        let actions = client.handle(ClientEvent::SocketOpened { generation });
        assert_eq!(actions, vec![ClientAction::SendText {
            generation,
            text: format!(r#"{{"ChangeGroup":{{"group_id":"{ROOM}"}}}}"#),
        }]);
    }

    #[test]
    fn ready_without_room_sends_nothing() {
        let mut client = client();
        let _ = client.handle(ClientEvent::AuthChanged(true));
        let generation = client.connection().generation();
        assert!(client.handle(ClientEvent::SocketOpened { generation }).is_empty());
    }

    #[test]
    fn live_append_leaves_gate_alone() {
        let mut client = client();
        let generation = open(&mut client);

        frame(&mut client, generation, r#"{"LoadMessages":[]}"#);
        assert!(client.pagination().is_blocked());
        frame(&mut client, generation, r#"{"Message":{"nickname":"a","content":"D","sat":4}}"#);
        assert!(client.pagination().is_blocked());
        assert_eq!(contents(&client), ["D"]);
    }

    #[test]
    fn request_older_sends_loaded_count() {
        let mut client = client();
        let generation = open(&mut client);
        let page: Vec<String> = (0..5)
            .map(|i| format!(r#"{{"nickname":"a","content":"{i}","sat":{i}}}"#))
            .collect();
        frame(&mut client, generation, &format!(r#"{{"LoadMessages":[{}]}}"#, page.join(",")));
        assert!(!client.pagination().is_blocked());

        assert_eq!(client.handle(ClientEvent::RequestOlder), vec![ClientAction::SendText {
            generation,
            text: r#"{"RequestMessages":{"loaded":5}}"#.into(),
        }]);
    }

    #[test]
    fn request_older_is_skipped_while_blocked() {
        let mut client = client();
        let generation = open(&mut client);
        frame(&mut client, generation, r#"{"LoadMessages":[{"nickname":"a","content":"hi","sat":1}]}"#);

        assert!(client.pagination().is_blocked());
        assert!(client.request_older().is_empty());
    }

    #[test]
    fn post_message_does_not_append_locally() {
        let mut client = client();
        let generation = open(&mut client);

        let actions = client.post_message("hello".into());
        assert_eq!(actions, vec![ClientAction::SendText {
            generation,
            text: r#"{"SendMessage":{"content":"hello"}}"#.into(),
        }]);
        assert!(client.messages().is_empty());
    }

    #[test]
    fn commands_while_disconnected_are_dropped() {
        let mut client = client();
        assert!(client.post_message("lost".into()).is_empty());
        assert!(client.switch_room(ROOM).is_empty());
        assert_eq!(client.current_room(), Some(ROOM), "selection survives for the next connect");
    }

    #[test]
    fn frames_from_stale_socket_are_dropped() {
        let mut client = client();
        let first = open(&mut client);
        let _ = client.handle(ClientEvent::AuthChanged(false));
        let _ = client.handle(ClientEvent::SocketClosed {
            generation: first,
            close: CloseInfo::clean(1000, "logout"),
        });
        let _second = open(&mut client);

        frame(&mut client, first, r#"{"Message":{"nickname":"a","content":"late","sat":1}}"#);
        assert!(client.messages().is_empty());
    }

    #[test]
    fn retry_while_unauthorized_is_dropped() {
        let mut client = client();
        let generation = open(&mut client);

        let actions = client.handle(ClientEvent::SocketClosed {
            generation,
            close: CloseInfo::abnormal("reset"),
        });
        assert!(matches!(actions.as_slice(), [ClientAction::ScheduleRetry { .. }]));

        let _ = client.handle(ClientEvent::AuthChanged(false));
        assert!(client.handle(ClientEvent::RetryElapsed { generation }).is_empty());
        assert_eq!(client.connection_status(), ConnectionStatus::Closed);
    }

    #[test]
    fn shutdown_disconnects_and_clears_observers() {
        let mut client = client();
        let generation = open(&mut client);
        client.messages_mut().subscribe(|_| {});
        client.pagination_mut().subscribe(|_| {});

        let actions = client.shutdown();
        assert_eq!(actions, vec![ClientAction::CloseSocket {
            generation,
            code: 1000,
            reason: LOGOUT_REASON.into(),
        }]);
        assert!(!client.is_authorized());
        assert_eq!(client.connection_status(), ConnectionStatus::Closing);
        assert_eq!(client.messages().observer_count(), 0);
        assert_eq!(client.pagination().observer_count(), 0);
    }
}
