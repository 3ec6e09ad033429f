//! Streams one payload frame from a sender's socket to any number of peers.
//!
//! The payload is moved through a single bounded buffer, one chunk at a
//! time, and written to every target before the next chunk is read. Target
//! writers are locked in ascending `conn_id` order for the whole frame, which
//! keeps frames atomic per stream and rules out lock-order deadlocks between
//! concurrent relays.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWriteExt};

use pushwire_core::error::Result;
use pushwire_core::protocol::{payload_header, Command};

use crate::relay::peer::{Peer, WriterGuard};
use crate::transport::codec::FrameReader;

struct Target {
    peer: Arc<Peer>,
    writer: WriterGuard,
    ok: bool,
}

impl Target {
    async fn write(&mut self, bytes: &[u8]) {
        if !self.ok {
            return;
        }
        if let Err(e) = self.writer.write_all(bytes).await {
            self.fail(e);
        }
    }

    async fn flush(&mut self) {
        if !self.ok {
            return;
        }
        if let Err(e) = self.writer.flush().await {
            self.fail(e);
        }
    }

    // The target's stream now holds a partial frame and cannot be resynced.
    fn fail(&mut self, e: std::io::Error) {
        tracing::debug!(target_conn = self.peer.conn_id(), error = %e, "relay write failed; closing target");
        self.ok = false;
        self.peer.close();
    }
}

/// Outcome of a relayed frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Targets that received the complete frame.
    pub delivered: usize,
    /// Payload bytes consumed from the sender.
    pub payload_bytes: u64,
}

/// Consume `len` payload bytes from `reader` and deliver `[cmd][len][payload]`
/// to every distinct, still-open peer in `targets`.
///
/// The payload is always fully consumed, even with no targets, so the
/// sender's stream stays framed. A failed target write closes that target
/// only. A failed read from the sender closes every target that already
/// received part of the frame and returns the error.
pub async fn relay<R>(
    reader: &mut FrameReader<R>,
    mut targets: Vec<Arc<Peer>>,
    cmd: Command,
    len: u32,
    chunk_bytes: usize,
) -> Result<Delivery>
where
    R: AsyncRead + Unpin,
{
    targets.sort_unstable_by_key(|p| p.conn_id());
    targets.dedup_by_key(|p| p.conn_id());

    let mut locked = Vec::with_capacity(targets.len());
    for peer in targets {
        if peer.is_closing() {
            continue;
        }
        let writer = peer.lock_writer().await;
        locked.push(Target {
            peer,
            writer,
            ok: true,
        });
    }

    let header = payload_header(cmd, len);
    for t in locked.iter_mut() {
        t.write(&header).await;
    }

    let total = len as usize;
    let mut remaining = total;
    let mut buf = vec![0u8; chunk_bytes.max(1).min(total)];
    while remaining > 0 {
        let n = remaining.min(buf.len());
        let chunk = &mut buf[..n];
        if let Err(e) = reader.read_exact(chunk).await {
            for t in locked.iter_mut().filter(|t| t.ok) {
                t.ok = false;
                t.peer.close();
            }
            return Err(e);
        }
        for t in locked.iter_mut() {
            if t.peer.is_closing() && t.ok {
                t.ok = false;
            }
            t.write(chunk).await;
        }
        remaining -= n;
    }

    for t in locked.iter_mut() {
        t.flush().await;
    }

    Ok(Delivery {
        delivered: locked.iter().filter(|t| t.ok).count(),
        payload_bytes: total as u64,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, DuplexStream};
    use tokio_util::sync::CancellationToken;

    fn peer(conn_id: u64) -> (Arc<Peer>, DuplexStream) {
        let (ours, theirs) = tokio::io::duplex(1 << 20);
        let addr = "127.0.0.1:9".parse().unwrap();
        (Arc::new(Peer::new(conn_id, addr, ours)), theirs)
    }

    async fn read_frame(stream: &mut DuplexStream) -> (u8, Vec<u8>) {
        let cmd = stream.read_u8().await.unwrap();
        let len = stream.read_u32().await.unwrap() as usize;
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).await.unwrap();
        (cmd, payload)
    }

    #[tokio::test]
    async fn payload_larger_than_chunk_reaches_every_target_once() {
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let (mut sender, server_side) = tokio::io::duplex(1 << 20);
        sender.write_all(&payload).await.unwrap();
        let mut reader = FrameReader::new(server_side, CancellationToken::new());

        let (a, mut a_rx) = peer(1);
        let (b, mut b_rx) = peer(2);
        let targets = vec![Arc::clone(&b), Arc::clone(&a), Arc::clone(&b)];

        let out = relay(&mut reader, targets, Command::Push, payload.len() as u32, 512)
            .await
            .unwrap();
        assert_eq!(out.delivered, 2);
        assert_eq!(out.payload_bytes, 5000);

        for rx in [&mut a_rx, &mut b_rx] {
            let (cmd, got) = read_frame(rx).await;
            assert_eq!(cmd, Command::Push.as_u8());
            assert_eq!(got, payload);
        }
    }

    #[tokio::test]
    async fn payload_is_consumed_without_targets() {
        let (mut sender, server_side) = tokio::io::duplex(1024);
        sender.write_all(&[0xaa; 10]).await.unwrap();
        sender.write_all(&[5]).await.unwrap();
        let mut reader = FrameReader::new(server_side, CancellationToken::new());

        let out = relay(&mut reader, Vec::new(), Command::Broadcast, 10, 4)
            .await
            .unwrap();
        assert_eq!(out.delivered, 0);
        assert_eq!(reader.read_command().await.unwrap(), Command::Ip);
    }

    #[tokio::test]
    async fn truncated_sender_closes_partial_targets() {
        let (mut sender, server_side) = tokio::io::duplex(1024);
        sender.write_all(&[1, 2, 3]).await.unwrap();
        drop(sender);
        let mut reader = FrameReader::new(server_side, CancellationToken::new());

        let (a, _a_rx) = peer(1);
        let res = relay(&mut reader, vec![Arc::clone(&a)], Command::Broadcast, 8, 4).await;
        assert!(res.is_err());
        assert!(a.is_closing());
    }

    #[tokio::test]
    async fn failed_target_is_closed_and_others_get_the_frame() {
        let payload: Vec<u8> = (0..4000u32).map(|i| (i % 241) as u8).collect();
        let (mut sender, server_side) = tokio::io::duplex(1 << 20);
        sender.write_all(&payload).await.unwrap();
        let mut reader = FrameReader::new(server_side, CancellationToken::new());

        let (dead, dead_rx) = peer(1);
        drop(dead_rx);
        let (healthy, mut healthy_rx) = peer(2);

        let out = relay(
            &mut reader,
            vec![Arc::clone(&dead), Arc::clone(&healthy)],
            Command::Broadcast,
            payload.len() as u32,
            512,
        )
        .await
        .unwrap();

        assert_eq!(out.delivered, 1);
        assert!(dead.is_closing());
        assert!(!healthy.is_closing());

        let (cmd, got) = read_frame(&mut healthy_rx).await;
        assert_eq!(cmd, Command::Broadcast.as_u8());
        assert_eq!(got, payload);
    }
}
