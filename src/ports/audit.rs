//! Audit Sink Port - Append-only Trade Ledger
//!
//! Defines the persistence interface for the audit trail: write-once
//! trade ledger entries plus periodic cumulative summaries. The log is
//! the source of truth for trade totals; the in-memory account is just a
//! running tally. Persistent failure upstream manifests only as gaps in
//! this log.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of protocol event an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    AuctionStart,
    Bid,
    Reveal,
    AuctionClose,
    AuctionBuy,
    AuctionSell,
    AuctionLost,
    AuctionNoWinner,
    AuctionSelfDeal,
    BalanceSnapshot,
}

/// Whether the recorded operation succeeded on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStatus {
    Success,
    Failed,
}

/// A single write-once audit record. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLedgerEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// Wall-clock timestamp (Unix ms).
    pub timestamp_ms: u64,
    /// The account this coordinator trades as.
    pub account: String,
    /// Event classification.
    pub event_type: AuditEventType,
    /// Energy involved, in kWh, when applicable.
    pub energy_kwh: Option<f64>,
    /// Price involved, in ETH, when applicable.
    pub price_eth: Option<f64>,
    /// Best-effort account balance at record time, in ETH.
    pub balance_eth: Option<f64>,
    /// Counterparty account, when one is known.
    pub counterparty: Option<String>,
    /// Ledger call outcome.
    pub status: AuditStatus,
}

impl TradeLedgerEntry {
    /// Create an entry with a fresh id and the current wall clock;
    /// optional fields start empty.
    pub fn new(account: impl Into<String>, event_type: AuditEventType, status: AuditStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp_ms: chrono::Utc::now().timestamp_millis() as u64,
            account: account.into(),
            event_type,
            energy_kwh: None,
            price_eth: None,
            balance_eth: None,
            counterparty: None,
            status,
        }
    }

    pub fn energy(mut self, kwh: f64) -> Self {
        self.energy_kwh = Some(kwh);
        self
    }

    pub fn price(mut self, eth: f64) -> Self {
        self.price_eth = Some(eth);
        self
    }

    pub fn balance(mut self, eth: Option<f64>) -> Self {
        self.balance_eth = eth;
        self
    }

    pub fn counterparty(mut self, account: impl Into<String>) -> Self {
        self.counterparty = Some(account.into());
        self
    }
}

/// Periodic snapshot of the cumulative account totals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TradeSummary {
    /// Wall-clock timestamp (Unix ms).
    pub timestamp_ms: u64,
    /// Cumulative energy bought, in kWh.
    pub total_bought_kwh: f64,
    /// Cumulative energy sold, in kWh.
    pub total_sold_kwh: f64,
}

/// Trait for audit persistence providers.
///
/// Append-only and safe for concurrent writers without coordination.
/// A failed append is logged by the caller and never retried — the gap
/// itself is the failure signal.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    /// Append one trade ledger entry.
    async fn append_entry(&self, entry: &TradeLedgerEntry) -> anyhow::Result<()>;

    /// Append one cumulative summary row.
    async fn append_summary(&self, summary: &TradeSummary) -> anyhow::Result<()>;

    /// Whether the sink is writable.
    async fn is_healthy(&self) -> bool;
}
