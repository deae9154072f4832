//! Chat message payload.

use serde::{Deserialize, Serialize};

/// Server-assigned group identifier.
pub type RoomId = uuid::Uuid;

/// A single chat item as delivered by the server.
///
/// Messages carry no stable identifier, so the client cannot deduplicate
/// them. Ordering is whatever order the server delivered them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender identity. Older server builds send the user id instead.
    #[serde(alias = "user_id")]
    pub nickname: String,
    /// Message body.
    pub content: String,
    /// Sent-at Unix timestamp in seconds.
    pub sat: i64,
}

impl ChatMessage {
    /// Create a message.
    pub fn new(nickname: impl Into<String>, content: impl Into<String>, sat: i64) -> Self {
        Self { nickname: nickname.into(), content: content.into(), sat }
    }
}
