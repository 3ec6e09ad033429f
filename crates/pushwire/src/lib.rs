//! Top-level facade crate for pushwire.
//!
//! Re-exports the wire codec and the relay server library so users can depend on a single crate.

pub mod core {
    pub use pushwire_core::*;
}

pub mod server {
    pub use pushwire_server::*;
}
