//! Streaming request reader.
//!
//! Fields are read with `read_exact` semantics, so a multi-byte field split
//! across TCP segments is accumulated before it is interpreted. Every read
//! races the connection's closing token: once another task tears the
//! connection down, the pending read resolves to `PushwireError::Closed`.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use pushwire_core::error::{PushwireError, Result};
use pushwire_core::protocol::Command;

pub struct FrameReader<R> {
    inner: R,
    closing: CancellationToken,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R, closing: CancellationToken) -> Self {
        Self { inner, closing }
    }

    /// Read and validate the next command byte.
    pub async fn read_command(&mut self) -> Result<Command> {
        let b = self.read_u8().await?;
        Command::parse_request(b)
    }

    pub async fn read_u8(&mut self) -> Result<u8> {
        tokio::select! {
            biased;
            _ = self.closing.cancelled() => Err(PushwireError::Closed),
            r = self.inner.read_u8() => Ok(r?),
        }
    }

    /// Big-endian u32.
    pub async fn read_u32(&mut self) -> Result<u32> {
        tokio::select! {
            biased;
            _ = self.closing.cancelled() => Err(PushwireError::Closed),
            r = self.inner.read_u32() => Ok(r?),
        }
    }

    /// Fill `buf` completely.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.closing.cancelled() => Err(PushwireError::Closed),
            r = self.inner.read_exact(buf) => {
                r?;
                Ok(())
            }
        }
    }
}
