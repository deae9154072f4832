//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding inbound or encoding outbound frames.
///
/// None of these are fatal to a connection. The caller logs the error and
/// discards the frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame text is not valid JSON.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Frame is valid JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// Frame object must have exactly one top-level key.
    #[error("frame must carry exactly one tag, found {count}")]
    TagCount {
        /// Number of top-level keys present.
        count: usize,
    },

    /// Tag is not one of the known server variants.
    #[error("unknown frame tag: {tag}")]
    UnknownTag {
        /// The unrecognized key.
        tag: String,
    },

    /// Tag is known but its payload has the wrong shape.
    #[error("invalid payload for {tag}: {reason}")]
    InvalidPayload {
        /// Variant tag.
        tag: &'static str,
        /// Deserializer message.
        reason: String,
    },

    /// Outbound value could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Errors produced while deriving the socket endpoint from a base URL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// Base URL scheme has no socket counterpart.
    #[error("unsupported base URL scheme: {scheme}")]
    UnsupportedScheme {
        /// Scheme of the rejected base URL.
        scheme: String,
    },

    /// Base URL has no hierarchical path to extend.
    #[error("base URL cannot be a base: {0}")]
    CannotBeABase(String),
}
