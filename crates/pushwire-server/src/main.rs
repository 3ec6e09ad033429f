//! pushwire relay server.
//!
//! - Config: `PUSHWIRE_CONFIG` (default `pushwire.yaml`), defaults when absent
//! - Logging: `RUST_LOG` via tracing-subscriber's `EnvFilter`
//! - One task per connection; Ctrl-C stops accepting

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use pushwire_core::error::{PushwireError, Result};
use pushwire_server::{app_state::AppState, config, transport::listener};

const DEFAULT_CONFIG_PATH: &str = "pushwire.yaml";

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "pushwire-server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = std::env::var("PUSHWIRE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let cfg = config::load_or_default(&path)?;
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .map_err(|e| PushwireError::BadRequest(format!("server.listen: {e}")))?;

    let state = AppState::new(cfg);

    tracing::info!(%listen, config = %path, "pushwire-server starting");
    let tcp = tokio::net::TcpListener::bind(listen).await?;

    listener::serve(tcp, state.clone(), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    })
    .await;

    tracing::info!(metrics = %state.metrics().render(), "shutdown");
    Ok(())
}
