//! CLI errors.

use std::io;

use courier_app::RuntimeError;
use courier_client::{Generation, transport::TransportError};
use courier_proto::EndpointError;
use thiserror::Error;

/// Errors from the terminal client and its socket driver.
#[derive(Debug, Error)]
pub enum CliError {
    /// The base URL cannot be turned into a socket endpoint.
    #[error("invalid base URL: {0}")]
    Endpoint(#[from] EndpointError),

    /// I/O error on stdin or stdout.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No socket with this generation is open.
    #[error("no socket for generation {0}")]
    UnknownSocket(Generation),

    /// The runtime stopped.
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// `/room` argument is not a room id.
    #[error("invalid room id {input:?}: {reason}")]
    InvalidRoom {
        /// Argument as typed.
        input: String,
        /// Parse error.
        reason: String,
    },

    /// Unrecognized slash command.
    #[error("unknown command {0:?}, try /room, /older, /login, /logout or /quit")]
    UnknownCommand(String),
}
