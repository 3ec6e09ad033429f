//! Transport layer (TCP).
//!
//! Exposes the listener/accept loop, the per-connection command handler, and
//! the streaming reader it decodes requests with.

pub mod codec;
pub mod handler;
pub mod listener;
