//! Ledger Adapters - alloy-rs 0.9 Integration
//!
//! RPC provider management and the Vickrey auction contract binding.

pub mod auction;
pub mod provider;

pub use auction::VickreyAuction;
pub use provider::LedgerProvider;
