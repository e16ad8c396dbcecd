//! Lightweight in-process metrics.
//!
//! Counters, gauges and a latency histogram stored as atomics in `DashMap`s
//! and rendered in Prometheus text format by the `/metrics` handler.

pub mod metrics;

pub use metrics::RelayMetrics;
