//! Courier wire protocol
//!
//! Every frame exchanged with the chat server is a UTF-8 text frame holding a
//! single JSON object with exactly one top-level key. The key names the
//! variant, the value carries its payload:
//!
//! ```text
//! {"LoadMessages":[{"nickname":"a","content":"hi","sat":1}]}
//! {"RequestMessages":{"loaded":5}}
//! ```
//!
//! # Components
//!
//! - [`ServerFrame`]: inbound variants (full reset, live append, backward page)
//! - [`ClientCommand`]: outbound commands
//! - [`ChatMessage`]: a single chat item
//! - [`endpoint`]: derivation of the socket URL from the HTTP base URL

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod endpoint;
pub mod errors;
pub mod frame;
pub mod message;

pub use errors::{EndpointError, ProtocolError, Result};
pub use frame::{ClientCommand, ServerFrame};
pub use message::{ChatMessage, RoomId};
