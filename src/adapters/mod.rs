//! Adapters Layer - Infrastructure Implementations
//!
//! Concrete implementations of the ports: the in-process message bus,
//! the alloy-rs ledger client, the HTTP forecaster client, JSONL audit
//! persistence, and Prometheus metrics.

pub mod api;
pub mod bus;
pub mod chain;
pub mod metrics;
pub mod persistence;
