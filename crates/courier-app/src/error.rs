//! Runtime errors.

use thiserror::Error;

/// Errors returned by [`crate::Runtime::run`] and [`crate::ChatHandle`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    /// The driver's event source ended while the runtime was running.
    #[error("driver stopped producing events")]
    DriverStopped,

    /// The runtime is no longer running.
    #[error("runtime stopped")]
    Stopped,
}
