//! Client→server requests.
//!
//! Parsing rules:
//! - Never index (`buf[0]`), always use `Buf` and `remaining()` checks.
//! - Never allocate from a declared count before the bytes are present.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{PushwireError, Result};
use crate::protocol::command::Command;

/// A fully buffered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Echo(Bytes),
    Bind(u32),
    Push { ids: Vec<u32>, payload: Bytes },
    Broadcast(Bytes),
    Ip,
}

impl Request {
    pub fn command(&self) -> Command {
        match self {
            Request::Echo(_) => Command::Echo,
            Request::Bind(_) => Command::Bind,
            Request::Push { .. } => Command::Push,
            Request::Broadcast(_) => Command::Broadcast,
            Request::Ip => Command::Ip,
        }
    }

    /// Encode to wire bytes.
    pub fn encode(&self) -> Result<Bytes> {
        let mut out = BytesMut::new();
        out.put_u8(self.command().as_u8());
        match self {
            Request::Echo(payload) | Request::Broadcast(payload) => {
                put_payload(&mut out, payload)?;
            }
            Request::Bind(id) => out.put_u32(*id),
            Request::Push { ids, payload } => {
                out.put_u32(len_u32(ids.len())?);
                for id in ids {
                    out.put_u32(*id);
                }
                put_payload(&mut out, payload)?;
            }
            Request::Ip => {}
        }
        Ok(out.freeze())
    }
}

fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| PushwireError::BadRequest("length exceeds u32".into()))
}

fn put_payload(out: &mut BytesMut, payload: &Bytes) -> Result<()> {
    out.put_u32(len_u32(payload.len())?);
    out.put_slice(payload);
    Ok(())
}

fn need(buf: &Bytes, n: usize, what: &str) -> Result<()> {
    if buf.remaining() < n {
        return Err(PushwireError::BadRequest(format!("truncated {what}")));
    }
    Ok(())
}

fn take_payload(buf: &mut Bytes) -> Result<Bytes> {
    need(buf, 4, "payload length")?;
    let len = buf.get_u32() as usize;
    need(buf, len, "payload")?;
    Ok(buf.copy_to_bytes(len))
}

/// Decode exactly one request occupying all of `buf`.
pub fn decode_request(mut buf: Bytes) -> Result<Request> {
    need(&buf, 1, "command byte")?;
    let cmd = Command::parse_request(buf.get_u8())?;

    let req = match cmd {
        Command::Echo => Request::Echo(take_payload(&mut buf)?),
        Command::Broadcast => Request::Broadcast(take_payload(&mut buf)?),
        Command::Bind => {
            need(&buf, 4, "bind id")?;
            Request::Bind(buf.get_u32())
        }
        Command::Push => {
            need(&buf, 4, "push count")?;
            let count = buf.get_u32() as usize;
            let id_bytes = count
                .checked_mul(4)
                .ok_or_else(|| PushwireError::BadRequest("push count overflow".into()))?;
            need(&buf, id_bytes, "push id list")?;
            let ids = (0..count).map(|_| buf.get_u32()).collect();
            Request::Push {
                ids,
                payload: take_payload(&mut buf)?,
            }
        }
        Command::Ip => Request::Ip,
        Command::Error => return Err(PushwireError::UnknownCommand(cmd.as_u8())),
    };

    if buf.has_remaining() {
        return Err(PushwireError::BadRequest(format!(
            "{} trailing bytes after {}",
            buf.remaining(),
            cmd.as_str()
        )));
    }
    Ok(req)
}
