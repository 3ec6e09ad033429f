//! Server config loader (strict parsing).

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use pushwire_core::error::{PushwireError, Result};

pub use schema::{ServerConfig, ServerSection};

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| PushwireError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

/// Like [`load_from_file`], but a missing file yields the defaults.
pub fn load_or_default(path: &str) -> Result<ServerConfig> {
    match fs::metadata(path) {
        Ok(_) => load_from_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(ServerConfig::default()),
        Err(e) => Err(PushwireError::Internal(format!("stat config failed: {e}"))),
    }
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| PushwireError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
