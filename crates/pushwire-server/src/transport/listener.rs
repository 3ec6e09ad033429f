//! TCP accept loop.
//!
//! One spawned task per accepted socket. Accept failures are logged and the
//! loop keeps going; nothing a single client does can stop the listener.

use std::future::Future;
use std::io;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpListener, TcpStream};

use crate::app_state::AppState;
use crate::transport::handler::serve_connection;

/// Enable TCP keep-alive (idle time and probe interval both `period`) and
/// disable Nagle.
pub fn configure_socket(stream: &TcpStream, period: Duration) -> io::Result<()> {
    stream.set_nodelay(true)?;
    let keepalive = TcpKeepalive::new().with_time(period).with_interval(period);
    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}

/// Accept connections until `shutdown` resolves.
///
/// Handlers already running keep going after the loop returns; they end with
/// their sockets or with the runtime.
pub async fn serve<F>(listener: TcpListener, app: AppState, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let keepalive = app.cfg().server.keepalive();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("listener stopping");
                break;
            }
            accepted = listener.accept() => {
                let (stream, remote) = match accepted {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };

                if let Err(e) = configure_socket(&stream, keepalive) {
                    tracing::warn!(%remote, error = %e, "socket options not applied");
                }
                app.metrics().connections_accepted.inc(&[]);

                let (reader, writer) = stream.into_split();
                tokio::spawn(serve_connection(app.clone(), reader, writer, remote));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepted_socket_gets_keepalive_and_nodelay() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();

        configure_socket(&stream, Duration::from_secs(10)).unwrap();

        assert!(stream.nodelay().unwrap());
        assert!(SockRef::from(&stream).keepalive().unwrap());
    }
}
