//! Metrics Adapters - Prometheus Export

pub mod prometheus;

pub use prometheus::MetricsRegistry;
