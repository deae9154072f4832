//! Application layer for Courier
//!
//! Generic runtime that drives the sans-IO [`courier_client::Client`] from
//! four sources: transport events, the auth signal, UI commands and the
//! reconnect timer. The same orchestration code runs against the real
//! WebSocket driver and against scripted drivers in tests.
//!
//! # Components
//!
//! - [`Driver`]: Trait for platform-specific socket I/O
//! - [`Runtime`]: Event loop executing client actions through a Driver
//! - [`ChatHandle`]: Cloneable handle for UI callers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod error;
mod handle;
mod runtime;

pub use driver::{Driver, DriverEvent};
pub use error::RuntimeError;
pub use handle::ChatHandle;
pub use runtime::{Runtime, SHUTDOWN_GRACE};
