use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use pushwire_core::error::Result;

pub type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Exclusive access to one connection's outgoing stream.
///
/// Held for the duration of a whole frame so bytes from concurrent senders
/// never interleave.
pub type WriterGuard = OwnedMutexGuard<BufWriter<BoxedWriter>>;

/// One open connection as seen by every handler.
///
/// The owning handler reads from the socket; any handler may write to it
/// through [`Peer::lock_writer`].
pub struct Peer {
    conn_id: u64,
    remote: SocketAddr,
    writer: Arc<Mutex<BufWriter<BoxedWriter>>>,
    closing: CancellationToken,
}

impl Peer {
    pub fn new<W>(conn_id: u64, remote: SocketAddr, writer: W) -> Self
    where
        W: AsyncWrite + Send + 'static,
    {
        let boxed: BoxedWriter = Box::pin(writer);
        Self {
            conn_id,
            remote,
            writer: Arc::new(Mutex::new(BufWriter::new(boxed))),
            closing: CancellationToken::new(),
        }
    }

    /// Process-unique, never reused.
    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub async fn lock_writer(&self) -> WriterGuard {
        Arc::clone(&self.writer).lock_owned().await
    }

    /// Write one small, fully built frame and flush it.
    pub async fn send(&self, frame: &[u8]) -> Result<()> {
        let mut w = self.lock_writer().await;
        w.write_all(frame).await?;
        w.flush().await?;
        Ok(())
    }

    /// Ask the owning handler to stop. Idempotent.
    pub fn close(&self) {
        self.closing.cancel();
    }

    pub fn is_closing(&self) -> bool {
        self.closing.is_cancelled()
    }

    pub fn closing_token(&self) -> CancellationToken {
        self.closing.clone()
    }

    /// Flush pending bytes and half-close the stream. Errors are ignored: the
    /// peer is going away either way.
    pub async fn shutdown(&self) {
        let mut w = self.lock_writer().await;
        let _ = w.flush().await;
        let _ = w.shutdown().await;
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("conn_id", &self.conn_id)
            .field("remote", &self.remote)
            .field("closing", &self.is_closing())
            .finish()
    }
}
