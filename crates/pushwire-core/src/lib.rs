//! pushwire core: transport-agnostic wire primitives and error types.
//!
//! This crate defines the binary command protocol spoken between relay
//! clients and the server, together with the error surface shared by the
//! server and any client tooling. It carries no async runtime dependency so
//! the same codec can back blocking clients, test harnesses, and the server.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed input always surfaces as `PushwireError` so a hostile client
//! can never take the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Error surface and wire error codes.
pub use error::{ErrorCode, PushwireError, Result};
