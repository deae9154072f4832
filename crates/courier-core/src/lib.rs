//! Core state machines for the Courier chat client.
//!
//! Pure, I/O-free logic following the action pattern: methods take inputs and
//! return actions for a driver to execute. Nothing here owns a socket or a
//! timer, which keeps every transition deterministic and directly testable.
//!
//! # Components
//!
//! - [`connection::ConnectionManager`]: connection lifecycle, generation
//!   tracking, and single-shot reconnect scheduling

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod error;

pub use connection::{
    ABNORMAL_CLOSURE, CloseInfo, ConnectionAction, ConnectionConfig, ConnectionManager, ConnectionStatus,
    DEFAULT_RECONNECT_DELAY, Generation, NORMAL_CLOSURE,
};
pub use error::ConnectionError;
