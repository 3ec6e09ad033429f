//! pushwire relay server library entry.
//!
//! This crate wires configuration, the client registry, per-connection
//! handlers, and the TCP listener into a runnable relay. It is consumed by
//! the binary (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod config;
pub mod obs;
pub mod relay;
pub mod transport;
