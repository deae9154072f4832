//! Terminal client for Courier
//!
//! A thin shell over [`courier_app::Driver`] that provides WebSocket I/O and a
//! line-oriented console. All orchestration logic lives in the generic
//! [`courier_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod console;
pub mod driver;
mod error;

pub use courier_app::{ChatHandle, Driver, Runtime};
pub use driver::SocketDriver;
pub use error::CliError;
