use std::time::Duration;

use serde::Deserialize;
use pushwire_core::error::{PushwireError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PushwireError::UnsupportedVersion);
        }

        self.server.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// TCP keep-alive idle time and probe interval.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,

    /// Working buffer size for streamed payloads.
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            keepalive_secs: default_keepalive_secs(),
            chunk_bytes: default_chunk_bytes(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(PushwireError::BadRequest(
                "server.listen must be a valid socket address".into(),
            ));
        }
        if !(1..=3600).contains(&self.keepalive_secs) {
            return Err(PushwireError::BadRequest(
                "server.keepalive_secs must be between 1 and 3600".into(),
            ));
        }
        if !(512..=1_048_576).contains(&self.chunk_bytes) {
            return Err(PushwireError::BadRequest(
                "server.chunk_bytes must be between 512 and 1048576".into(),
            ));
        }
        Ok(())
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_keepalive_secs() -> u64 {
    10
}
fn default_chunk_bytes() -> usize {
    32 * 1024
}
