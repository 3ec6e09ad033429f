//! Per-connection command handler.
//!
//! Responsibilities:
//! - Join the registry's open set on start
//! - Read one command at a time, strictly in arrival order
//! - Bind once (Unbound -> Bound), never unbind while open
//! - Stream ECHO/PUSH/BROADCAST payloads through a bounded buffer
//! - On any exit: leave the registry, report protocol errors with an ERROR
//!   frame, and close the stream exactly once

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::Instrument;

use pushwire_core::error::{PushwireError, Result};
use pushwire_core::protocol::{error_frame, ip_reply, Command};

use crate::app_state::AppState;
use crate::relay::{self, Peer, Registry};
use crate::transport::codec::FrameReader;

/// Run one connection to completion.
///
/// Never returns an error: every failure is scoped to this connection and
/// ends in the same cleanup path.
pub async fn serve_connection<R, W>(app: AppState, reader: R, writer: W, remote: SocketAddr)
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Send + 'static,
{
    let registry = app.registry();
    let conn_id = registry.next_conn_id();
    let span = tracing::info_span!("conn", conn_id, peer = %remote);

    async move {
        let peer = Arc::new(Peer::new(conn_id, remote, writer));
        registry.add_connection(Arc::clone(&peer));
        app.metrics().connections_open.inc(&[]);
        tracing::debug!("connection opened");

        let mut session = Session {
            reader: FrameReader::new(reader, peer.closing_token()),
            chunk_bytes: app.cfg().server.chunk_bytes,
            bound: None,
            peer,
            registry,
            app,
        };

        let err = match session.run().await {
            Ok(()) => PushwireError::Closed,
            Err(e) => e,
        };
        session.close(err).await;
    }
    .instrument(span)
    .await
}

struct Session<R> {
    app: AppState,
    registry: Arc<Registry>,
    peer: Arc<Peer>,
    reader: FrameReader<R>,
    chunk_bytes: usize,
    bound: Option<u32>,
}

impl<R: AsyncRead + Unpin> Session<R> {
    async fn run(&mut self) -> Result<()> {
        loop {
            let cmd = self.reader.read_command().await?;
            self.app
                .metrics()
                .commands
                .inc(&[("command", cmd.as_str())]);

            match cmd {
                Command::Echo => self.echo().await?,
                Command::Bind => self.bind().await?,
                Command::Push => self.push().await?,
                Command::Broadcast => self.broadcast().await?,
                Command::Ip => self.ip().await?,
                Command::Error => return Err(PushwireError::UnknownCommand(cmd.as_u8())),
            }
        }
    }

    async fn echo(&mut self) -> Result<()> {
        let len = self.reader.read_u32().await?;
        let targets = vec![Arc::clone(&self.peer)];
        self.relay_payload(targets, Command::Echo, len).await
    }

    async fn bind(&mut self) -> Result<()> {
        let id = self.reader.read_u32().await?;
        if let Some(current) = self.bound {
            return Err(PushwireError::RepeatBinding(current));
        }
        if id == 0 {
            return Err(PushwireError::BindInvalid);
        }
        if !self.registry.register(id, &self.peer) {
            return Err(PushwireError::BindConflict(id));
        }

        self.bound = Some(id);
        tracing::info!(id, "bound");
        Ok(())
    }

    async fn push(&mut self) -> Result<()> {
        let count = self.reader.read_u32().await?;
        // Resolve while reading so a huge declared count never allocates;
        // repeated ids collapse to one entry per connection.
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for _ in 0..count {
            let id = self.reader.read_u32().await?;
            if let Some(peer) = self.registry.lookup(id) {
                if seen.insert(peer.conn_id()) {
                    targets.push(peer);
                }
            }
        }
        let len = self.reader.read_u32().await?;
        self.relay_payload(targets, Command::Push, len).await
    }

    async fn broadcast(&mut self) -> Result<()> {
        let len = self.reader.read_u32().await?;
        let targets = self.registry.peers_except(self.peer.conn_id());
        self.relay_payload(targets, Command::Broadcast, len).await
    }

    async fn ip(&mut self) -> Result<()> {
        let frame = ip_reply(&self.peer.remote().to_string())?;
        self.peer.send(&frame).await
    }

    async fn relay_payload(&mut self, targets: Vec<Arc<Peer>>, cmd: Command, len: u32) -> Result<()> {
        let out = relay::relay(&mut self.reader, targets, cmd, len, self.chunk_bytes).await?;

        let labels = [("command", cmd.as_str())];
        let metrics = self.app.metrics();
        metrics.relayed_bytes.add(&labels, out.payload_bytes);
        metrics.relay_deliveries.add(&labels, out.delivered as u64);
        tracing::trace!(command = cmd.as_str(), len, delivered = out.delivered, "relayed");
        Ok(())
    }

    async fn close(self, reason: PushwireError) {
        // Leave the registry before anything that can wait on the write lock.
        self.registry.remove_connection(self.peer.conn_id());
        if let Some(id) = self.bound {
            self.registry.unregister(id);
        }
        self.app.metrics().connections_open.dec(&[]);

        if let Some(code) = reason.error_code() {
            tracing::info!(code = code.as_str(), error = %reason, "protocol error; closing");
            self.app
                .metrics()
                .protocol_errors
                .inc(&[("code", code.as_str())]);
            let _ = self.peer.send(&error_frame(code)).await;
        } else {
            tracing::debug!(error = %reason, "connection closed");
        }

        self.peer.close();
        self.peer.shutdown().await;
    }
}
