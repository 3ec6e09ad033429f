//! Binary command protocol.
//!
//! Every client→server message starts with a command byte followed by
//! command-specific big-endian fields and, for payload-carrying commands, a
//! u32 length and that many opaque bytes.
//!
//! - `command`: command byte values and request-side validation.
//! - `frame`: server→client frame encoders plus an incremental reply decoder.
//! - `request`: client-side request encoding and whole-buffer request decoding.
//!
//! All parsers are panic-free: they check `remaining()` before every read
//! and report truncation as `PushwireError`.

pub mod command;
pub mod frame;
pub mod request;

pub use command::Command;
pub use frame::{decode_ip_reply, decode_reply, error_frame, ip_reply, payload_header, Reply};
pub use request::{decode_request, Request};

/// Length of `[cmd][len:u32]`, the header of every payload-carrying frame.
pub const PAYLOAD_HEADER_LEN: usize = 5;

/// Length of `[0][code:u16]`.
pub const ERROR_FRAME_LEN: usize = 3;
