//! Client
//!
//! Action-based chat sync client. Keeps a local, ordered message log in step
//! with the chat server over a single WebSocket, bound to an external auth
//! signal, with backward pagination gated on what the server has sent.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and Action-Based patterns as
//! [`courier_core`]. It receives events ([`ClientEvent`]), processes them
//! through pure state machine logic, and returns actions ([`ClientAction`]) for
//! the caller to execute. Store changes are pushed to observers synchronously.
//!
//! # Components
//!
//! - [`Client`]: Top-level state machine and inbound/outbound dispatch
//! - [`MessageLog`]: Observable ordered chat history
//! - [`PaginationGate`]: Observable "no older pages" flag
//! - [`AuthBinding`]: Edge detector over the auth signal
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::spawn`]: Open a WebSocket and pump its events into a channel
//! - [`transport::SocketHandle`]: Send and close on a spawned socket

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod auth;
mod client;
mod config;
mod event;
mod pagination;
mod store;

#[cfg(feature = "transport")]
pub mod transport;

pub use auth::{AuthBinding, AuthTransition};
pub use client::{Client, LOGOUT_REASON};
pub use config::{ClientConfig, DEFAULT_PAGE_SIZE};
pub use courier_core::{CloseInfo, ConnectionStatus, Generation};
pub use courier_proto::{ChatMessage, RoomId};
pub use event::{ClientAction, ClientEvent};
pub use pagination::PaginationGate;
pub use store::{MessageLog, Observable, SubscriptionId};
