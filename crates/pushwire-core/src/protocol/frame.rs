//! Server→client frames.
//!
//! Encoders produce only headers for payload-carrying frames: payload bytes
//! are streamed separately so a large payload is never held whole.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ErrorCode, PushwireError, Result};
use crate::protocol::command::Command;
use crate::protocol::{ERROR_FRAME_LEN, PAYLOAD_HEADER_LEN};

/// `[cmd][len:u32]` header preceding `len` payload bytes.
pub fn payload_header(cmd: Command, len: u32) -> [u8; PAYLOAD_HEADER_LEN] {
    let mut out = [0u8; PAYLOAD_HEADER_LEN];
    let mut w = &mut out[..];
    w.put_u8(cmd.as_u8());
    w.put_u32(len);
    out
}

/// `[0][code:u16]`.
pub fn error_frame(code: ErrorCode) -> [u8; ERROR_FRAME_LEN] {
    let mut out = [0u8; ERROR_FRAME_LEN];
    let mut w = &mut out[..];
    w.put_u8(Command::Error.as_u8());
    w.put_u16(code.as_u16());
    out
}

/// IP reply: `[len:u32][len bytes UTF-8]`, no command byte.
///
/// Built from scratch on every call.
pub fn ip_reply(addr: &str) -> Result<Bytes> {
    let len = u32::try_from(addr.len())
        .map_err(|_| PushwireError::Internal("address text exceeds u32".into()))?;
    let mut out = BytesMut::with_capacity(4 + addr.len());
    out.put_u32(len);
    out.put_slice(addr.as_bytes());
    Ok(out.freeze())
}

/// A complete frame received by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Raw code; see [`ErrorCode::from_u16`].
    Error(u16),
    Echo(Bytes),
    Push(Bytes),
    Broadcast(Bytes),
}

impl Reply {
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Reply::Error(code) => ErrorCode::from_u16(*code),
            _ => None,
        }
    }
}

/// Decode one server frame from the front of `buf`.
///
/// Returns `Ok(None)` and leaves `buf` untouched until a whole frame is
/// buffered. IP replies carry no command byte and must be read with
/// [`decode_ip_reply`] instead.
pub fn decode_reply(buf: &mut BytesMut) -> Result<Option<Reply>> {
    let mut peek: &[u8] = buf.as_ref();
    if peek.remaining() < 1 {
        return Ok(None);
    }

    let cmd_byte = peek.get_u8();
    let cmd = Command::from_u8(cmd_byte).ok_or_else(|| {
        PushwireError::BadRequest(format!("unexpected reply command byte {cmd_byte}"))
    })?;

    if cmd == Command::Error {
        if peek.remaining() < 2 {
            return Ok(None);
        }
        let code = peek.get_u16();
        buf.advance(ERROR_FRAME_LEN);
        return Ok(Some(Reply::Error(code)));
    }

    if !matches!(cmd, Command::Echo | Command::Push | Command::Broadcast) {
        return Err(PushwireError::BadRequest(format!(
            "{} is not a server frame",
            cmd.as_str()
        )));
    }

    if peek.remaining() < 4 {
        return Ok(None);
    }
    let len = peek.get_u32() as usize;
    if peek.remaining() < len {
        return Ok(None);
    }

    buf.advance(PAYLOAD_HEADER_LEN);
    let payload = buf.split_to(len).freeze();
    Ok(Some(match cmd {
        Command::Echo => Reply::Echo(payload),
        Command::Push => Reply::Push(payload),
        _ => Reply::Broadcast(payload),
    }))
}

/// Decode an IP reply from the front of `buf`, once complete.
pub fn decode_ip_reply(buf: &mut BytesMut) -> Result<Option<String>> {
    let mut peek: &[u8] = buf.as_ref();
    if peek.remaining() < 4 {
        return Ok(None);
    }
    let len = peek.get_u32() as usize;
    if peek.remaining() < len {
        return Ok(None);
    }

    buf.advance(4);
    let text = buf.split_to(len);
    String::from_utf8(text.to_vec())
        .map(Some)
        .map_err(|e| PushwireError::BadRequest(format!("ip reply is not utf-8: {e}")))
}
