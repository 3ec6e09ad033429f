//! Shared relay state and cross-connection delivery.
//!
//! `Registry` is the only shared mutable state in the server. `Peer` is the
//! write side of one connection, and `fanout` streams a payload frame to a
//! set of peers.

pub mod fanout;
pub mod peer;
pub mod registry;

pub use fanout::{relay, Delivery};
pub use peer::Peer;
pub use registry::Registry;
