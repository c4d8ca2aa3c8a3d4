//! Lightweight in-process metrics.
//!
//! Counters and a latency histogram kept in atomics, rendered in the
//! Prometheus text format on demand (`TerminalSession::metrics`).

pub mod metrics;

pub use metrics::SessionMetrics;
