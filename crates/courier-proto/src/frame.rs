//! Inbound and outbound frame types.
//!
//! Inbound decoding is an explicit validation step rather than a plain serde
//! call: the frame must be a JSON object, carry exactly one key, and that key
//! must name one of the three [`ServerFrame`] variants. Anything else is a
//! [`ProtocolError`] that the caller logs and drops.
//!
//! # Invariants
//!
//! - A frame that decodes successfully had exactly one top-level key.
//! - Encoding a [`ClientCommand`] always produces a one-key object.

use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor},
};
use serde_json::Value;

use crate::{
    ChatMessage, RoomId,
    errors::{ProtocolError, Result},
};

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ServerFrame {
    /// Full reset: replaces the whole client-visible log, e.g. after a room
    /// switch.
    LoadMessages(Vec<ChatMessage>),

    /// Live append: one newly sent message.
    Message(ChatMessage),

    /// Backward page: older messages to prepend, oldest first.
    LoadRequested(Vec<ChatMessage>),
}

impl ServerFrame {
    /// Tag of the full-reset variant.
    pub const LOAD_MESSAGES: &'static str = "LoadMessages";
    /// Tag of the live-append variant.
    pub const MESSAGE: &'static str = "Message";
    /// Tag of the backward-page variant.
    pub const LOAD_REQUESTED: &'static str = "LoadRequested";

    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if the text is not JSON
    /// - `ProtocolError::NotAnObject` if the top-level value is not an object
    /// - `ProtocolError::TagCount` unless there is exactly one key
    /// - `ProtocolError::UnknownTag` if the key is not a server variant
    /// - `ProtocolError::InvalidPayload` if the payload has the wrong shape
    pub fn decode(text: &str) -> Result<Self> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let Envelope::Object(entries) = envelope else {
            return Err(ProtocolError::NotAnObject);
        };

        let count = entries.len();
        let mut entries = entries.into_iter();
        let (tag, payload) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => return Err(ProtocolError::TagCount { count }),
        };

        match tag.as_str() {
            Self::LOAD_MESSAGES => decode_payload(Self::LOAD_MESSAGES, payload).map(Self::LoadMessages),
            Self::MESSAGE => decode_payload(Self::MESSAGE, payload).map(Self::Message),
            Self::LOAD_REQUESTED => {
                decode_payload(Self::LOAD_REQUESTED, payload).map(Self::LoadRequested)
            },
            _ => Err(ProtocolError::UnknownTag { tag }),
        }
    }

    /// Encode as a text frame.
    ///
    /// The client never sends these; this exists for servers and test peers.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Wire tag of this variant.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::LoadMessages(_) => Self::LOAD_MESSAGES,
            Self::Message(_) => Self::MESSAGE,
            Self::LoadRequested(_) => Self::LOAD_REQUESTED,
        }
    }
}

/// Top level of an inbound frame.
///
/// Keeps every key as it appears, duplicates included; a `serde_json::Map`
/// would silently collapse repeated keys into the last one.
enum Envelope {
    Object(Vec<(String, Value)>),
    Other,
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(EnvelopeVisitor)
    }
}

struct EnvelopeVisitor;

impl<'de> Visitor<'de> for EnvelopeVisitor {
    type Value = Envelope;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Envelope, A::Error> {
        let mut entries = Vec::new();
        while let Some(entry) = map.next_entry::<String, Value>()? {
            entries.push(entry);
        }
        Ok(Envelope::Object(entries))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Envelope, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Envelope::Other)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> std::result::Result<Envelope, E> {
        Ok(Envelope::Other)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> std::result::Result<Envelope, E> {
        Ok(Envelope::Other)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> std::result::Result<Envelope, E> {
        Ok(Envelope::Other)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> std::result::Result<Envelope, E> {
        Ok(Envelope::Other)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> std::result::Result<Envelope, E> {
        Ok(Envelope::Other)
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Envelope, E> {
        Ok(Envelope::Other)
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(tag: &'static str, payload: Value) -> Result<T> {
    serde_json::from_value(payload)
        .map_err(|e| ProtocolError::InvalidPayload { tag, reason: e.to_string() })
}

/// Commands sent by the client.
///
/// None of these mutate local state when sent. The server answers
/// `ChangeGroup` with a full reset, `SendMessage` with a live append to every
/// participant including the sender, and `RequestMessages` with a backward
/// page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ClientCommand {
    /// Switch the active room.
    ChangeGroup {
        /// Target room.
        group_id: RoomId,
    },

    /// Post a message to the active room.
    SendMessage {
        /// Message body.
        content: String,
    },

    /// Request the page of messages preceding the ones already held.
    RequestMessages {
        /// Number of messages currently held by the client.
        loaded: u64,
    },
}

impl ClientCommand {
    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Wire tag of this command.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ChangeGroup { .. } => "ChangeGroup",
            Self::SendMessage { .. } => "SendMessage",
            Self::RequestMessages { .. } => "RequestMessages",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_full_reset() {
        let frame =
            ServerFrame::decode(r#"{"LoadMessages":[{"nickname":"a","content":"hi","sat":1}]}"#)
                .unwrap();
        assert_eq!(frame, ServerFrame::LoadMessages(vec![ChatMessage::new("a", "hi", 1)]));
        assert_eq!(frame.tag(), "LoadMessages");
    }

    #[test]
    fn decode_live_append() {
        let frame =
            ServerFrame::decode(r#"{"Message":{"nickname":"b","content":"yo","sat":2}}"#).unwrap();
        assert_eq!(frame, ServerFrame::Message(ChatMessage::new("b", "yo", 2)));
    }

    #[test]
    fn decode_empty_backward_page() {
        let frame = ServerFrame::decode(r#"{"LoadRequested":[]}"#).unwrap();
        assert_eq!(frame, ServerFrame::LoadRequested(vec![]));
    }

    #[test]
    fn reject_invalid_json() {
        assert!(matches!(ServerFrame::decode("{not json"), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn reject_non_object() {
        assert_eq!(ServerFrame::decode("[1,2]"), Err(ProtocolError::NotAnObject));
        assert_eq!(ServerFrame::decode(r#""Message""#), Err(ProtocolError::NotAnObject));
    }

    #[test]
    fn reject_wrong_tag_count() {
        assert_eq!(ServerFrame::decode("{}"), Err(ProtocolError::TagCount { count: 0 }));
        assert_eq!(
            ServerFrame::decode(r#"{"LoadMessages":[],"LoadRequested":[]}"#),
            Err(ProtocolError::TagCount { count: 2 })
        );
    }

    #[test]
    fn reject_repeated_tag() {
        let text = r#"{"LoadMessages":[],"LoadMessages":[{"nickname":"a","content":"hi","sat":1}]}"#;
        assert_eq!(ServerFrame::decode(text), Err(ProtocolError::TagCount { count: 2 }));

        let text = r#"{"Message":{"nickname":"a","content":"x","sat":1},"Message":{"nickname":"b","content":"y","sat":2},"Message":{"nickname":"c","content":"z","sat":3}}"#;
        assert_eq!(ServerFrame::decode(text), Err(ProtocolError::TagCount { count: 3 }));
    }

    #[test]
    fn reject_scalar_top_level() {
        for text in ["null", "true", "42", "-1.5"] {
            assert_eq!(ServerFrame::decode(text), Err(ProtocolError::NotAnObject), "{text}");
        }
    }

    #[test]
    fn reject_unknown_tag() {
        assert_eq!(
            ServerFrame::decode(r#"{"Kick":{"from":"x","reason":"y"}}"#),
            Err(ProtocolError::UnknownTag { tag: "Kick".to_string() })
        );
    }

    #[test]
    fn reject_mismatched_payload() {
        let result = ServerFrame::decode(r#"{"Message":[]}"#);
        assert!(matches!(result, Err(ProtocolError::InvalidPayload { tag: "Message", .. })));

        let result = ServerFrame::decode(r#"{"LoadMessages":{"nickname":"a"}}"#);
        assert!(matches!(result, Err(ProtocolError::InvalidPayload { tag: "LoadMessages", .. })));
    }

    #[test]
    fn command_encodings() {
        let change = ClientCommand::ChangeGroup { group_id: RoomId::nil() };
        insta::assert_snapshot!(
            change.encode().unwrap(),
            @r#"{"ChangeGroup":{"group_id":"00000000-0000-0000-0000-000000000000"}}"#
        );

        let send = ClientCommand::SendMessage { content: "hello".to_string() };
        insta::assert_snapshot!(send.encode().unwrap(), @r#"{"SendMessage":{"content":"hello"}}"#);

        let request = ClientCommand::RequestMessages { loaded: 5 };
        insta::assert_snapshot!(request.encode().unwrap(), @r#"{"RequestMessages":{"loaded":5}}"#);
    }

    #[test]
    fn server_frame_encoding_matches_decoder() {
        let frame = ServerFrame::LoadRequested(vec![ChatMessage::new("a", "old", 0)]);
        insta::assert_snapshot!(
            frame.encode().unwrap(),
            @r#"{"LoadRequested":[{"nickname":"a","content":"old","sat":0}]}"#
        );
        assert_eq!(ServerFrame::decode(&frame.encode().unwrap()).unwrap(), frame);
    }
}
