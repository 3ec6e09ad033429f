//! Lightweight in-process metrics.
//!
//! Counters and gauges are stored as atomics and rendered in Prometheus text
//! format on demand; the binary logs a snapshot at shutdown.

pub mod metrics;

pub use metrics::RelayMetrics;
