//! Shared application state for the relay server.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::obs::RelayMetrics;
use crate::relay::Registry;

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<ServerConfig>,
    registry: Arc<Registry>,
    metrics: Arc<RelayMetrics>,
}

impl AppState {
    pub fn new(cfg: ServerConfig) -> Self {
        Self {
            cfg: Arc::new(cfg),
            registry: Arc::new(Registry::new()),
            metrics: Arc::new(RelayMetrics::default()),
        }
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }
}
