//! Persistence Adapters - JSONL Audit Storage

pub mod audit;

pub use audit::JsonlAuditSink;
